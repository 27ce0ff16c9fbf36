//! Session plumbing: edge sources, the locked decoder session, history, settings.

pub mod config;
pub mod error;
pub mod logbuf;
pub mod record;
pub mod replay;
pub mod serial_service;
pub mod sniffer;
pub mod source;

pub use config::SnifferConfig;
pub use error::{Result, SnifferError};
pub use logbuf::{LogEntry, TransactionLog};
pub use record::EdgeRecord;
pub use replay::ReplaySource;
pub use serial_service::{PortInfo, SerialConfig, SerialEdgeSource, SourceEvent};
pub use sniffer::Sniffer;
pub use source::{EdgeCallback, EdgeDispatcher, EdgeSource, Watch};
