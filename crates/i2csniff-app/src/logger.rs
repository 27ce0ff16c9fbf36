//! `log` backend that writes to stderr or a file.

use crate::parse_args::Verbosity;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::Mutex;

/// Output destination for logger
enum Output {
    Stderr,
    File(BufWriter<File>),
}

pub struct Logger {
    output: Mutex<Output>,
    level: LevelFilter,
}

impl Logger {
    pub fn stderr(verbosity: Verbosity) -> Self {
        Logger {
            output: Mutex::new(Output::Stderr),
            level: verbosity.level_filter(),
        }
    }

    pub fn file(path: &str, verbosity: Verbosity) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Logger {
            output: Mutex::new(Output::File(BufWriter::new(file))),
            level: verbosity.level_filter(),
        })
    }

    /// Make this the global logger.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut output) = self.output.lock() {
            match &mut *output {
                Output::Stderr => {
                    eprintln!("[{:5} {}] {}", record.level(), record.target(), record.args());
                }
                Output::File(f) => {
                    let _ = writeln!(f, "[{:5} {}] {}", record.level(), record.target(), record.args());
                    let _ = f.flush();
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut output) = self.output.lock() {
            if let Output::File(f) = &mut *output {
                let _ = f.flush();
            }
        }
    }
}
