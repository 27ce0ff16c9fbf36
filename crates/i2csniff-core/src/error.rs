use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnifferError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Record { line: usize, reason: String },

    #[error("sampler link closed")]
    Closed,

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SnifferError>;
