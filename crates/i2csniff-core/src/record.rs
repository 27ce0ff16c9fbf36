//! Text form of a single edge report: `<pin> <level> <tick>`.
//!
//! Both the serial sampler and capture files use this format. Blank lines
//! and lines starting with `#` carry no record.

use i2csniff_decode::{EdgeEvent, Level};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRecord {
    pub pin: u8,
    /// Raw level as reported; 0 and 1 are levels, anything else is noise.
    pub level: u32,
    pub tick: u32,
}

impl EdgeRecord {
    pub fn new(pin: u8, level: u32, tick: u32) -> Self {
        Self { pin, level, tick }
    }

    /// Record for `event` as seen on `pin`. Invalid levels are written as 2,
    /// the watchdog value GPIO daemons use.
    pub fn from_event(event: &EdgeEvent, pin: u8) -> Self {
        let level = match event.level {
            Level::Low => 0,
            Level::High => 1,
            Level::Invalid => 2,
        };
        Self::new(pin, level, event.tick)
    }

    /// Parse one line, returning `Ok(None)` for blanks and comments.
    pub fn parse_line(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        line.parse().map(Some)
    }
}

impl FromStr for EdgeRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace();
        let mut next = |name: &str| {
            fields
                .next()
                .ok_or_else(|| format!("missing {name} field"))
        };
        let pin = next("pin")?;
        let level = next("level")?;
        let tick = next("tick")?;
        if fields.next().is_some() {
            return Err(format!("trailing data in {s:?}"));
        }
        Ok(Self {
            pin: pin.parse().map_err(|_| format!("bad pin {pin:?}"))?,
            level: level.parse().map_err(|_| format!("bad level {level:?}"))?,
            tick: tick.parse().map_err(|_| format!("bad tick {tick:?}"))?,
        })
    }
}

impl fmt::Display for EdgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pin, self.level, self.tick)
    }
}
