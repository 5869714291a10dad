//! Human-readable durations

const ONE_SECOND_MS: u64 = 1000;
const ONE_MINUTE_MS: u64 = 60 * ONE_SECOND_MS;

/// Format a duration in milliseconds for display.
///
/// Up to one second is shown as `"500ms"`, up to a minute as `"1.5s"`,
/// and anything longer as `"1m 5s"`.
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    if ms > ONE_MINUTE_MS {
        let minutes = ms / ONE_MINUTE_MS;
        let seconds = (ms % ONE_MINUTE_MS) / ONE_SECOND_MS;
        format!("{minutes}m {seconds}s")
    } else if ms > ONE_SECOND_MS {
        #[allow(clippy::cast_precision_loss)] // at most 60_000
        let seconds = ms as f64 / 1000.0;
        format!("{seconds:.1}s")
    } else {
        format!("{ms}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milliseconds() {
        assert_eq!(format_duration_ms(0), "0ms");
        assert_eq!(format_duration_ms(500), "500ms");
        assert_eq!(format_duration_ms(1000), "1000ms");
    }

    #[test]
    fn test_seconds_one_decimal() {
        assert_eq!(format_duration_ms(1500), "1.5s");
        assert_eq!(format_duration_ms(12_340), "12.3s");
        assert_eq!(format_duration_ms(60_000), "60.0s");
    }

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(format_duration_ms(65_000), "1m 5s");
        assert_eq!(format_duration_ms(60_001), "1m 0s");
        assert_eq!(format_duration_ms(3_725_999), "62m 5s");
    }
}
