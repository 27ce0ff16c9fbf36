//! Passive I2C decoding: edge classification, framing, transaction records.

pub mod edge;
pub mod emit;
pub mod i2c;
pub mod synth;

pub use edge::{Edge, EdgeClassifier, EdgeEvent, Level, Line};
pub use emit::{baud_estimate, Token, Transaction, TransactionSink};
pub use i2c::{DecoderOptions, FrameState, I2cDecoder, DEFAULT_TIMEOUT_US};
pub use synth::BusScript;

/// Decode a complete edge sequence, collecting every emitted transaction.
pub fn decode_all<'a, I>(options: DecoderOptions, events: I) -> Vec<Transaction>
where
    I: IntoIterator<Item = &'a EdgeEvent>,
{
    let mut decoder = I2cDecoder::new(options);
    let mut out = Vec::new();
    for event in events {
        decoder.process(event, &mut out);
    }
    out
}
