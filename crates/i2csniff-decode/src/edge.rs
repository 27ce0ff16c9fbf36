
/// Bus line an edge was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Scl,
    Sda,
}

/// Level reported by the sampling source.
///
/// `Invalid` covers anything that is not a plain 0 or 1, such as the
/// watchdog pseudo-events some GPIO daemons deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
    Invalid,
}

impl Level {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Low,
            1 => Self::High,
            _ => Self::Invalid,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Low => Some(false),
            Self::High => Some(true),
            Self::Invalid => None,
        }
    }
}

/// One observed level change on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    pub line: Line,
    pub level: Level,
    /// Microsecond tick, wraps at `u32::MAX`.
    pub tick: u32,
}

impl EdgeEvent {
    pub fn new(line: Line, level: Level, tick: u32) -> Self {
        Self { line, level, tick }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    None,
}

/// Remembers the last level of both lines and turns level reports into edges.
#[derive(Debug, Clone)]
pub struct EdgeClassifier {
    scl: bool,
    sda: bool,
}

impl Default for EdgeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeClassifier {
    /// Both lines start high, as on an idle bus.
    pub fn new() -> Self {
        Self { scl: true, sda: true }
    }

    pub fn classify(&mut self, event: &EdgeEvent) -> Edge {
        let Some(level) = event.level.as_bool() else {
            return Edge::None;
        };
        let last = match event.line {
            Line::Scl => &mut self.scl,
            Line::Sda => &mut self.sda,
        };
        if *last == level {
            return Edge::None;
        }
        *last = level;
        if level {
            Edge::Rising
        } else {
            Edge::Falling
        }
    }

    pub fn scl(&self) -> bool {
        self.scl
    }

    pub fn sda(&self) -> bool {
        self.sda
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(line: Line, raw: u32) -> EdgeEvent {
        EdgeEvent::new(line, Level::from_raw(raw), 0)
    }

    #[test]
    fn test_idle_levels_are_high() {
        let c = EdgeClassifier::new();
        assert!(c.scl());
        assert!(c.sda());
    }

    #[test]
    fn test_classify_directions() {
        let mut c = EdgeClassifier::new();
        assert_eq!(c.classify(&ev(Line::Sda, 1)), Edge::None);
        assert_eq!(c.classify(&ev(Line::Sda, 0)), Edge::Falling);
        assert!(!c.sda());
        assert_eq!(c.classify(&ev(Line::Sda, 0)), Edge::None);
        assert_eq!(c.classify(&ev(Line::Scl, 0)), Edge::Falling);
        assert_eq!(c.classify(&ev(Line::Scl, 1)), Edge::Rising);
        assert!(c.scl());
    }

    #[test]
    fn test_invalid_level_leaves_state() {
        let mut c = EdgeClassifier::new();
        c.classify(&ev(Line::Scl, 0));
        assert_eq!(c.classify(&ev(Line::Scl, 2)), Edge::None);
        assert!(!c.scl());
        assert!(c.sda());
    }
}
