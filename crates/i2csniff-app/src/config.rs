//! Settings file loading and command-line overrides.

use crate::parse_args::AppArgs;
use anyhow::{Context, Result};
use i2csniff_core::SnifferConfig;
use std::path::{Path, PathBuf};

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("i2csniff").join("config.json"))
}

/// Load settings from `explicit`, or from the default location if a file
/// exists there. An explicit path must exist.
pub fn load(explicit: Option<&Path>) -> Result<SnifferConfig> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match default_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(SnifferConfig::default()),
        },
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    let cfg = parse(&text).with_context(|| format!("parsing settings {}", path.display()))?;
    log::info!("settings loaded from {}", path.display());
    Ok(cfg)
}

pub fn parse(text: &str) -> serde_json::Result<SnifferConfig> {
    serde_json::from_str(text)
}

pub fn apply_args(cfg: &mut SnifferConfig, args: &AppArgs) {
    if let Some(port) = &args.port {
        cfg.serial.port_name = port.clone();
    }
    if let Some(baud_rate) = args.baud_rate {
        cfg.serial.baud_rate = baud_rate;
    }
    if let Some(scl) = args.scl {
        cfg.scl = scl;
    }
    if let Some(sda) = args.sda {
        cfg.sda = sda;
    }
    if args.keep_mode {
        cfg.set_as_inputs = false;
    }
    if let Some(timeout_us) = args.timeout_us {
        cfg.decoder.timeout_us = timeout_us;
    }
    if args.no_timestamps {
        cfg.decoder.timestamps = false;
    }
    if args.no_baud {
        cfg.decoder.baud = false;
    }
    if let Some(history) = args.history {
        cfg.history = history;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_args::{Mode, Verbosity};

    fn bare_args() -> AppArgs {
        AppArgs {
            mode: Mode::Demo,
            port: None,
            baud_rate: None,
            duration: None,
            scl: None,
            sda: None,
            keep_mode: false,
            timeout_us: None,
            no_timestamps: false,
            no_baud: false,
            json: false,
            output: None,
            history: None,
            anomalies_only: false,
            config: None,
            save: None,
            verbosity: Verbosity::Quiet,
            log_file: None,
        }
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = parse(r#"{ "scl": 5, "decoder": { "baud": false }, "serial": { "port_name": "/dev/ttyACM0" } }"#)
            .unwrap();
        assert_eq!(cfg.scl, 5);
        assert_eq!(cfg.sda, 2);
        assert!(!cfg.decoder.baud);
        assert!(cfg.decoder.timestamps);
        assert_eq!(cfg.decoder.timeout_us, 4000);
        assert_eq!(cfg.serial.port_name, "/dev/ttyACM0");
        assert_eq!(cfg.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_args_override() {
        let mut cfg = SnifferConfig::default();
        let args = AppArgs {
            port: Some("COM4".into()),
            sda: Some(9),
            keep_mode: true,
            no_timestamps: true,
            timeout_us: Some(2500),
            history: Some(5),
            ..bare_args()
        };
        apply_args(&mut cfg, &args);
        assert_eq!(cfg.serial.port_name, "COM4");
        assert_eq!((cfg.scl, cfg.sda), (3, 9));
        assert!(!cfg.set_as_inputs);
        assert!(!cfg.decoder.timestamps);
        assert!(cfg.decoder.baud);
        assert_eq!(cfg.decoder.timeout_us, 2500);
        assert_eq!(cfg.history, 5);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        assert!(load(Some(Path::new("/nonexistent/i2csniff.json"))).is_err());
    }
}
