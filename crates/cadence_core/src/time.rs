//! Internal tick units.
//!
//! Timeline positions and tangent durations are measured in a fixed
//! 6000-ticks-per-second unit (1 tick = 1/6 ms), so long chains of short
//! key frames do not accumulate floating-point drift.

use std::time::Duration;

/// Ticks per second of logical clock time.
pub const TICKS_PER_SECOND: i64 = 6000;

/// Convert a duration to whole ticks, rounding half up.
///
/// Offsets beyond the representable range (tens of millions of years)
/// saturate at `i64::MAX` instead of wrapping, so they stay ordered after
/// every shorter offset.
pub fn ticks_from_duration(duration: Duration) -> i64 {
    let nanos = duration.as_nanos();
    let ticks = (nanos * TICKS_PER_SECOND as u128 + 500_000_000) / 1_000_000_000;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}

/// Convert whole ticks back to a duration, saturating at `Duration::MAX`.
pub fn duration_from_ticks(ticks: i64) -> Duration {
    let secs = ticks.max(0) as f64 / TICKS_PER_SECOND as f64;
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Fractional tick count for a frame delta.
pub fn ticks_f64(duration: Duration) -> f64 {
    duration.as_secs_f64() * TICKS_PER_SECOND as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_times_six() {
        assert_eq!(ticks_from_duration(Duration::from_millis(2000)), 12000);
        assert_eq!(ticks_from_duration(Duration::from_millis(1)), 6);
        assert_eq!(ticks_from_duration(Duration::ZERO), 0);
    }

    #[test]
    fn test_rounding_half_up() {
        // 1/12 ms = half a tick
        assert_eq!(ticks_from_duration(Duration::from_nanos(83_334)), 1);
        assert_eq!(ticks_from_duration(Duration::from_nanos(83_000)), 0);
    }

    #[test]
    fn test_extreme_durations_saturate() {
        let huge = Duration::from_secs(1_600_000_000_000_000);
        assert_eq!(ticks_from_duration(huge), i64::MAX);
        assert_eq!(ticks_from_duration(Duration::MAX), i64::MAX);

        // Saturated offsets still sort after every ordinary offset
        let ordinary = ticks_from_duration(Duration::from_secs(86_400));
        assert!(ordinary >= 0);
        assert!(ticks_from_duration(huge) > ordinary);

        assert_eq!(duration_from_ticks(i64::MAX), Duration::MAX);
    }

    #[test]
    fn test_roundtrip() {
        let d = Duration::from_millis(500);
        assert_eq!(duration_from_ticks(ticks_from_duration(d)), d);
    }

    #[test]
    fn test_fractional_ticks() {
        assert!((ticks_f64(Duration::from_millis(100)) - 600.0).abs() < 1e-9);
    }
}
