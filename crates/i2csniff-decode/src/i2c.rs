//! I2C frame assembler.
//!
//! Consumes classified SCL/SDA edges and tracks framing:
//!   1. SDA falling while SCL high opens a transaction (START)
//!   2. each SCL rising edge samples one data bit, MSB first
//!   3. after eight bits the byte is flushed and the ninth clock pulse
//!      carries the ACK bit, resolved when SCL falls again
//!   4. SDA rising while SCL high closes the transaction (STOP)
//!
//! Anomalies are written into the transaction as annotation tokens;
//! decoding never fails.

use crate::edge::{Edge, EdgeClassifier, EdgeEvent, Line};
use crate::emit::{baud_estimate, Token, TransactionBuffer, TransactionSink};
use log::debug;
use serde::{Deserialize, Serialize};

/// Longest SDA silence tolerated inside a transaction.
pub const DEFAULT_TIMEOUT_US: u32 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderOptions {
    /// SDA gap (us) after which an open transaction is abandoned.
    pub timeout_us: u32,
    /// Prefix each transaction with the START time in seconds.
    pub timestamps: bool,
    /// Append the `baud=` estimate at STOP.
    pub baud: bool,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            timeout_us: DEFAULT_TIMEOUT_US,
            timestamps: true,
            baud: true,
        }
    }
}

impl DecoderOptions {
    /// Bare record format: no timestamp prefix, no baud annotation.
    pub fn plain() -> Self {
        Self {
            timestamps: false,
            baud: false,
            ..Self::default()
        }
    }
}

/// Framing state of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No transaction open.
    Idle,
    /// Assembling a data byte; `bits` is always below 8.
    Byte { bits: u8, value: u8 },
    /// Byte flushed, acknowledge bit pending. `clocked` is set once the
    /// ninth SCL pulse has risen.
    AckWait { clocked: bool },
}

impl FrameState {
    pub fn in_data(&self) -> bool {
        !matches!(self, FrameState::Idle)
    }

    pub fn in_ack(&self) -> bool {
        matches!(self, FrameState::AckWait { .. })
    }

    pub fn bit_count(&self) -> u8 {
        match self {
            FrameState::Byte { bits, .. } => *bits,
            _ => 0,
        }
    }

    const fn empty_byte() -> Self {
        FrameState::Byte { bits: 0, value: 0 }
    }
}

/// Decoding context for one monitored bus.
#[derive(Debug)]
pub struct I2cDecoder {
    options: DecoderOptions,
    classifier: EdgeClassifier,
    state: FrameState,
    buffer: TransactionBuffer,
    last_sda_tick: u32,
    last_start_tick: u32,
    scl_edges: u32,
}

impl Default for I2cDecoder {
    fn default() -> Self {
        Self::new(DecoderOptions::default())
    }
}

impl I2cDecoder {
    pub fn new(options: DecoderOptions) -> Self {
        Self {
            options,
            classifier: EdgeClassifier::new(),
            state: FrameState::Idle,
            buffer: TransactionBuffer::default(),
            last_sda_tick: 0,
            last_start_tick: 0,
            scl_edges: 0,
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn classifier(&self) -> &EdgeClassifier {
        &self.classifier
    }

    /// True while tokens are waiting for a STOP or timeout.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Handle one edge event. Completed transactions go to `sink`.
    pub fn process<S: TransactionSink + ?Sized>(&mut self, event: &EdgeEvent, sink: &mut S) {
        let edge = self.classifier.classify(event);
        if edge == Edge::None {
            return;
        }
        match event.line {
            Line::Sda => self.on_sda(edge, event.tick, sink),
            Line::Scl => self.on_scl(edge),
        }
    }

    fn on_sda<S: TransactionSink + ?Sized>(&mut self, edge: Edge, tick: u32, sink: &mut S) {
        if self.state.in_data() && tick.wrapping_sub(self.last_sda_tick) > self.options.timeout_us {
            debug!(
                "SDA silent for {}us, abandoning transaction",
                tick.wrapping_sub(self.last_sda_tick)
            );
            self.flush_partial();
            self.buffer.push(Token::Timeout);
            self.buffer.flush(sink);
            self.state = FrameState::Idle;
        }
        self.last_sda_tick = tick;

        if !self.classifier.scl() {
            return;
        }

        match edge {
            Edge::Rising => self.stop(tick, sink),
            Edge::Falling => self.start(tick),
            Edge::None => {}
        }
    }

    fn stop<S: TransactionSink + ?Sized>(&mut self, tick: u32, sink: &mut S) {
        match self.state {
            FrameState::AckWait { .. } => self.buffer.push(Token::Nack),
            FrameState::Byte { bits, .. } if bits > 1 => {
                debug!("STOP after {bits} bits");
                self.flush_partial();
                self.buffer.push(Token::Truncated(bits));
            }
            FrameState::Idle => debug!("STOP outside a transaction"),
            FrameState::Byte { .. } => {}
        }
        self.buffer.push(Token::Stop);
        if self.options.baud {
            let elapsed = tick.wrapping_sub(self.last_start_tick);
            self.buffer.push(Token::Baud(baud_estimate(self.scl_edges, elapsed)));
        }
        self.buffer.flush(sink);
        self.state = FrameState::Idle;
    }

    fn start(&mut self, tick: u32) {
        match self.state {
            FrameState::AckWait { .. } => {}
            FrameState::Idle => {
                self.scl_edges = 0;
                self.last_start_tick = tick;
                self.state = FrameState::empty_byte();
                if self.buffer.is_empty() {
                    self.buffer.mark_start(tick);
                    if self.options.timestamps {
                        self.buffer.push(Token::Timestamp(tick));
                    }
                }
                self.buffer.push(Token::Start);
            }
            FrameState::Byte { bits, .. } if bits <= 1 => {
                self.state = FrameState::empty_byte();
                self.buffer.push(Token::Start);
            }
            FrameState::Byte { bits, .. } => {
                debug!("SDA fell with SCL high after {bits} bits, keeping byte");
                self.buffer.push(Token::Misinterpreted(bits));
            }
        }
    }

    fn on_scl(&mut self, edge: Edge) {
        self.scl_edges = self.scl_edges.wrapping_add(1);
        let sda = self.classifier.sda();

        self.state = match (self.state, edge) {
            (FrameState::Byte { bits, value }, Edge::Rising) => {
                let value = (value << 1) | u8::from(sda);
                let bits = bits + 1;
                if bits == 8 {
                    self.buffer.push(Token::Byte(value));
                    FrameState::AckWait { clocked: false }
                } else {
                    FrameState::Byte { bits, value }
                }
            }
            (FrameState::AckWait { clocked: false }, Edge::Rising) => {
                FrameState::AckWait { clocked: true }
            }
            (FrameState::AckWait { clocked: true }, Edge::Falling) => {
                self.buffer.push(if sda { Token::Nack } else { Token::Ack });
                FrameState::empty_byte()
            }
            (state, _) => state,
        };
    }

    fn flush_partial(&mut self) {
        if let FrameState::Byte { bits, value } = self.state {
            if bits > 0 {
                self.buffer.push(Token::PartialByte {
                    value: value << (8 - bits),
                    bits,
                });
            }
        }
    }
}
