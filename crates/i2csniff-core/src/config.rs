use crate::serial_service::SerialConfig;
use crate::{Result, SnifferError};
use i2csniff_decode::{DecoderOptions, Line};
use serde::{Deserialize, Serialize};

/// Everything a monitoring session needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnifferConfig {
    /// Pin carrying SCL.
    pub scl: u8,
    /// Pin carrying SDA.
    pub sda: u8,
    /// Switch both pins to plain inputs. Leave false when the pins belong to
    /// an active bus peripheral that must keep its pin mode.
    pub set_as_inputs: bool,
    pub decoder: DecoderOptions,
    pub serial: SerialConfig,
    /// Transactions kept in memory for the exit summary.
    pub history: usize,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            scl: 3,
            sda: 2,
            set_as_inputs: true,
            decoder: DecoderOptions::default(),
            serial: SerialConfig::default(),
            history: 1000,
        }
    }
}

impl SnifferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scl == self.sda {
            return Err(SnifferError::Config(format!(
                "SCL and SDA both on pin {}",
                self.scl
            )));
        }
        if self.decoder.timeout_us == 0 {
            return Err(SnifferError::Config("timeout must be non-zero".into()));
        }
        Ok(())
    }

    pub fn pin(&self, line: Line) -> u8 {
        match line {
            Line::Scl => self.scl,
            Line::Sda => self.sda,
        }
    }
}
