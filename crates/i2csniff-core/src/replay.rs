//! Capture-file playback.

use crate::record::EdgeRecord;
use crate::source::{EdgeCallback, EdgeDispatcher, EdgeSource, Watch};
use crate::{Result, SnifferError};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;

/// Plays back edge records from a capture on the calling thread.
pub struct ReplaySource<R> {
    reader: R,
    dispatcher: Arc<EdgeDispatcher>,
}

impl ReplaySource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::info!("replaying {}", path.as_ref().display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl ReplaySource<Cursor<String>> {
    pub fn from_records(records: &[EdgeRecord]) -> Self {
        let text: String = records.iter().map(|r| format!("{r}\n")).collect();
        Self::from_reader(Cursor::new(text))
    }
}

impl<R: BufRead> ReplaySource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            dispatcher: EdgeDispatcher::new(),
        }
    }

    /// Dispatch every record in order. Returns the number of records read.
    ///
    /// A malformed line aborts playback with its line number.
    pub fn run(&mut self) -> Result<usize> {
        let mut count = 0;
        let mut line = String::new();
        let mut number = 0;
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            number += 1;
            let record = EdgeRecord::parse_line(&line)
                .map_err(|reason| SnifferError::Record { line: number, reason })?;
            if let Some(record) = record {
                self.dispatcher.dispatch(&record);
                count += 1;
            }
        }
        log::debug!("replayed {count} records from {number} lines");
        Ok(count)
    }
}

impl<R> EdgeSource for ReplaySource<R> {
    fn set_input(&self, pin: u8) -> Result<()> {
        log::debug!("replay: pin {pin} already an input");
        Ok(())
    }

    fn watch(&self, pin: u8, callback: EdgeCallback) -> Result<Watch> {
        Ok(self.dispatcher.register(pin, callback))
    }
}
