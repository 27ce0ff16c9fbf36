//! Transaction records and the buffer they are assembled in.

use serde::Serialize;
use std::fmt;

/// One element of a decoded transaction, in bus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Token {
    /// Tick of the START that opened an empty buffer.
    Timestamp(u32),
    Start,
    Stop,
    Byte(u8),
    /// Bits salvaged from an unfinished byte, already left-aligned.
    PartialByte { value: u8, bits: u8 },
    Ack,
    Nack,
    Timeout,
    Truncated(u8),
    Misinterpreted(u8),
    Baud(u64),
}

impl Token {
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            Token::Timeout | Token::Truncated(_) | Token::Misinterpreted(_)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Timestamp(tick) => write!(f, "{:7.3}: ", *tick as f64 / 1_000_000.0),
            Token::Start => f.write_str("["),
            Token::Stop => f.write_str("]"),
            Token::Byte(b) | Token::PartialByte { value: b, .. } => {
                f.write_str(&hex::encode_upper([*b]))
            }
            Token::Ack => f.write_str("+"),
            Token::Nack => f.write_str("-"),
            Token::Timeout => f.write_str(" !to"),
            Token::Truncated(n) => write!(f, " !{n}tr"),
            Token::Misinterpreted(n) => write!(f, " !{n}md"),
            Token::Baud(n) => write!(f, " baud={n}"),
        }
    }
}

/// A finished transaction as handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub start_tick: Option<u32>,
    pub tokens: Vec<Token>,
}

impl Transaction {
    pub fn text(&self) -> String {
        self.to_string()
    }

    /// Complete bytes paired with their acknowledge bit (`true` = ACK).
    pub fn bytes(&self) -> Vec<(u8, bool)> {
        self.tokens
            .windows(2)
            .filter_map(|pair| match pair {
                [Token::Byte(b), Token::Ack] => Some((*b, true)),
                [Token::Byte(b), Token::Nack] => Some((*b, false)),
                _ => None,
            })
            .collect()
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_anomaly())
    }

    pub fn is_clean(&self) -> bool {
        self.anomalies().next().is_none()
    }

    pub fn baud(&self) -> Option<u64> {
        self.tokens.iter().find_map(|t| match t {
            Token::Baud(n) => Some(*n),
            _ => None,
        })
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Receives completed transactions in emission order.
pub trait TransactionSink {
    fn accept(&mut self, transaction: Transaction);
}

impl TransactionSink for Vec<Transaction> {
    fn accept(&mut self, transaction: Transaction) {
        self.push(transaction);
    }
}

#[derive(Debug, Default)]
pub(crate) struct TransactionBuffer {
    start_tick: Option<u32>,
    tokens: Vec<Token>,
}

impl TransactionBuffer {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn mark_start(&mut self, tick: u32) {
        self.start_tick = Some(tick);
    }

    pub fn flush<S: TransactionSink + ?Sized>(&mut self, sink: &mut S) {
        let transaction = Transaction {
            start_tick: self.start_tick.take(),
            tokens: std::mem::take(&mut self.tokens),
        };
        log::trace!("emit {transaction}");
        sink.accept(transaction);
    }
}

/// Bits per second from the SCL transitions seen over `elapsed_us`.
pub fn baud_estimate(scl_edges: u32, elapsed_us: u32) -> u64 {
    1_000_000 * u64::from(scl_edges / 2) / (u64::from(elapsed_us) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        let t = Transaction {
            start_tick: Some(0),
            tokens: vec![
                Token::Start,
                Token::Byte(0xA6),
                Token::Ack,
                Token::Byte(0x32),
                Token::Nack,
                Token::Stop,
            ],
        };
        assert_eq!(t.text(), "[A6+32-]");
        assert_eq!(t.bytes(), vec![(0xA6, true), (0x32, false)]);
        assert!(t.is_clean());
    }

    #[test]
    fn test_render_annotations() {
        let t = Transaction {
            start_tick: Some(1_234_567),
            tokens: vec![
                Token::Timestamp(1_234_567),
                Token::Start,
                Token::PartialByte { value: 0xA0, bits: 3 },
                Token::Truncated(3),
                Token::Misinterpreted(4),
                Token::Timeout,
                Token::Stop,
                Token::Baud(99_009),
            ],
        };
        assert_eq!(t.text(), "  1.235: [A0 !3tr !4md !to] baud=99009");
        assert_eq!(t.anomalies().count(), 3);
        assert_eq!(t.baud(), Some(99_009));
        assert!(t.bytes().is_empty());
    }

    #[test]
    fn test_baud_estimate() {
        // 36 clock edges (18 bits) over 180us
        assert_eq!(baud_estimate(36, 179), 100_000);
        assert_eq!(baud_estimate(1, 0), 0);
        assert_eq!(baud_estimate(2, u32::MAX), 0);
    }

    #[test]
    fn test_flush_clears_buffer() {
        let mut buf = TransactionBuffer::default();
        buf.mark_start(7);
        buf.push(Token::Start);
        let mut out = Vec::new();
        buf.flush(&mut out);
        assert!(buf.is_empty());
        assert_eq!(out[0].start_tick, Some(7));
        buf.flush(&mut out);
        assert_eq!(out[1].start_tick, None);
    }
}
