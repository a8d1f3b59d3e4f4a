// Conversion between caller-facing seconds and native engine time units

use std::time::Duration;

/// A point in time expressed the way a native engine wants it:
/// `value / timescale` seconds (CMTime style; Android uses timescale 1000).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeTime {
    pub value: i64,
    pub timescale: i32,
}

impl NativeTime {
    pub const ZERO_MS: NativeTime = NativeTime { value: 0, timescale: 1000 };

    /// Negative and non-finite inputs clamp to zero.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        Self {
            value: (seconds * f64::from(timescale)).round() as i64,
            timescale,
        }
    }

    pub fn from_duration(duration: Duration, timescale: i32) -> Self {
        Self::from_seconds(duration.as_secs_f64(), timescale)
    }

    pub fn as_seconds(&self) -> f64 {
        if self.timescale <= 0 {
            return 0.0;
        }
        self.value as f64 / f64::from(self.timescale)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs_f64(self.as_seconds().max(0.0))
    }

    pub fn as_millis(&self) -> i64 {
        (self.as_seconds() * 1000.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_become_milliseconds() {
        let t = NativeTime::from_seconds(12.5, 1000);
        assert_eq!(t.value, 12_500);
        assert_eq!(t.as_millis(), 12_500);
        assert_eq!(t.as_duration(), Duration::from_millis(12_500));
    }

    #[test]
    fn invalid_inputs_clamp_to_zero() {
        assert_eq!(NativeTime::from_seconds(-3.0, 1000).value, 0);
        assert_eq!(NativeTime::from_seconds(f64::NAN, 1000).value, 0);
        assert_eq!(NativeTime { value: 10, timescale: 0 }.as_seconds(), 0.0);
    }
}
