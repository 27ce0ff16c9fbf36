//! Synthetic I2C edge streams.
//!
//! Builds the edge sequence a well-behaved master and slave would put on
//! the bus, with SDA only changing while SCL is low except for START and
//! STOP. Used by the `demo` command and by the decoder tests.

use crate::edge::{EdgeEvent, Level, Line};

/// Standard-mode half period (100 kbit/s).
pub const DEFAULT_HALF_PERIOD_US: u32 = 5;

#[derive(Debug, Clone)]
pub struct BusScript {
    half_period: u32,
    tick: u32,
    scl: bool,
    sda: bool,
    events: Vec<EdgeEvent>,
}

impl Default for BusScript {
    fn default() -> Self {
        Self::new(DEFAULT_HALF_PERIOD_US, 0)
    }
}

impl BusScript {
    /// Idle bus starting at `start_tick`, one SCL half period of
    /// `half_period` microseconds.
    pub fn new(half_period: u32, start_tick: u32) -> Self {
        Self {
            half_period: half_period.max(1),
            tick: start_tick,
            scl: true,
            sda: true,
            events: Vec::new(),
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn events(&self) -> &[EdgeEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<EdgeEvent> {
        self.events
    }

    pub fn start(mut self) -> Self {
        if !self.scl {
            self = self.set_sda(true).set_scl(true);
        }
        self.set_sda(true).set_sda(false).set_scl(false)
    }

    /// START issued without a preceding STOP.
    pub fn repeated_start(self) -> Self {
        self.set_sda(true).set_scl(true).set_sda(false).set_scl(false)
    }

    pub fn byte(mut self, value: u8, ack: bool) -> Self {
        for i in (0..8).rev() {
            self = self.bit(value & (1 << i) != 0);
        }
        self.bit(!ack)
    }

    pub fn bytes(mut self, pairs: &[(u8, bool)]) -> Self {
        for &(value, ack) in pairs {
            self = self.byte(value, ack);
        }
        self
    }

    /// Clock `count` bits of `level` without completing a byte.
    pub fn bits(mut self, level: bool, count: u8) -> Self {
        for _ in 0..count {
            self = self.bit(level);
        }
        self
    }

    pub fn stop(self) -> Self {
        self.set_sda(false).set_scl(true).set_sda(true)
    }

    /// Let the bus sit untouched for `us` microseconds.
    pub fn idle(mut self, us: u32) -> Self {
        self.tick = self.tick.wrapping_add(us);
        self
    }

    fn bit(self, level: bool) -> Self {
        self.set_sda(level).set_scl(true).set_scl(false)
    }

    fn set_scl(mut self, level: bool) -> Self {
        if self.scl != level {
            self.scl = level;
            self.push(Line::Scl, level);
        }
        self
    }

    fn set_sda(mut self, level: bool) -> Self {
        if self.sda != level {
            self.sda = level;
            self.push(Line::Sda, level);
        }
        self
    }

    fn push(&mut self, line: Line, level: bool) {
        self.tick = self.tick.wrapping_add(self.half_period);
        let level = if level { Level::High } else { Level::Low };
        self.events.push(EdgeEvent::new(line, level, self.tick));
    }
}
