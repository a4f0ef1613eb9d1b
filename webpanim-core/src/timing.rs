//! Frame timing derived from cumulative timestamps

/// Presentation timing of one decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameTiming {
    /// Milliseconds from the start of the animation until this frame ends
    pub timestamp_ms: i32,
    /// How long to show the frame in milliseconds
    pub delay_ms: i32,
}

/// Turns a stream of cumulative timestamps into per-frame delays.
///
/// The first frame is measured against a virtual predecessor at 0 ms, so its
/// delay equals its timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    previous_ms: i32,
}

impl FrameClock {
    /// Creates a clock positioned before the first frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the next timestamp and returns its timing
    pub fn tick(&mut self, timestamp_ms: i32) -> FrameTiming {
        let delay_ms = timestamp_ms.saturating_sub(self.previous_ms);
        self.previous_ms = timestamp_ms;
        FrameTiming {
            timestamp_ms,
            delay_ms,
        }
    }

    /// Timestamp of the last recorded frame (0 before the first)
    pub fn previous_ms(&self) -> i32 {
        self.previous_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_delay_is_absolute() {
        let mut clock = FrameClock::new();
        let first = clock.tick(480);
        assert_eq!(first, FrameTiming { timestamp_ms: 480, delay_ms: 480 });
        let second = clock.tick(1760);
        assert_eq!(second.delay_ms, 1280);
        assert_eq!(clock.previous_ms(), 1760);
    }

    #[test]
    fn test_repeated_timestamp_gives_zero_delay() {
        let mut clock = FrameClock::new();
        clock.tick(100);
        assert_eq!(clock.tick(100).delay_ms, 0);
    }
}
