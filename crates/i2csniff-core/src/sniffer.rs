//! A monitoring session: one decoder fed by two pin watches.

use crate::config::SnifferConfig;
use crate::source::{EdgeCallback, EdgeSource, Watch};
use crate::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use i2csniff_decode::{
    EdgeEvent, FrameState, I2cDecoder, Level, Line, Transaction, TransactionSink,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Hands transactions to the session's unbounded channel; never blocks.
struct ChannelSink<'a>(&'a Sender<Transaction>);

impl TransactionSink for ChannelSink<'_> {
    fn accept(&mut self, transaction: Transaction) {
        if self.0.send(transaction).is_err() {
            log::warn!("transaction receiver gone, dropping record");
        }
    }
}

/// Passive I2C monitor bound to an [`EdgeSource`].
///
/// SCL and SDA callbacks may fire on different threads. Each event is
/// classified, assembled and possibly emitted while holding the decoder
/// lock, so the two lines never interleave mid-transition.
pub struct Sniffer {
    decoder: Arc<Mutex<I2cDecoder>>,
    watches: Vec<Watch>,
    rx: Receiver<Transaction>,
}

impl Sniffer {
    pub fn start<S: EdgeSource + ?Sized>(source: &S, config: &SnifferConfig) -> Result<Self> {
        config.validate()?;
        if config.set_as_inputs {
            source.set_input(config.scl)?;
            source.set_input(config.sda)?;
        }

        let decoder = Arc::new(Mutex::new(I2cDecoder::new(config.decoder)));
        let (tx, rx) = unbounded();
        let mut watches = Vec::with_capacity(2);
        for line in [Line::Scl, Line::Sda] {
            let decoder = decoder.clone();
            let tx = tx.clone();
            let callback: EdgeCallback = Arc::new(move |_pin, level, tick| {
                let event = EdgeEvent::new(line, Level::from_raw(level), tick);
                decoder.lock().process(&event, &mut ChannelSink(&tx));
            });
            watches.push(source.watch(config.pin(line), callback)?);
        }
        log::info!(
            "monitoring SCL on pin {}, SDA on pin {}",
            config.scl,
            config.sda
        );

        Ok(Self { decoder, watches, rx })
    }

    /// Completed transactions in emission order.
    pub fn transactions(&self) -> &Receiver<Transaction> {
        &self.rx
    }

    pub fn state(&self) -> FrameState {
        self.decoder.lock().state()
    }

    /// Stop watching both lines and end the session.
    ///
    /// Returns transactions that were completed but not yet read. A
    /// transaction still in progress is dropped.
    pub fn cancel(mut self) -> Vec<Transaction> {
        for watch in self.watches.drain(..) {
            watch.cancel();
        }
        if self.decoder.lock().has_pending() {
            log::info!("session ended mid-transaction, discarding it");
        }
        self.rx.try_iter().collect()
    }
}
