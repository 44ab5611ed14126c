use std::time::{Duration, Instant};

/// Render a duration for log fields, e.g. `1.94ms` or `10.00s`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Elapsed time since `start`, warning when it exceeds `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, label: &str) -> Duration {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "slow {label}"
        );
    }
    elapsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_two_decimals() {
        assert_eq!(fmt_duration(Duration::from_secs(10)), "10.00s");
        assert_eq!(fmt_duration(Duration::from_micros(1940)), "1.94ms");
    }

    #[test]
    fn returns_elapsed() {
        let start = Instant::now() - Duration::from_millis(5);
        assert!(log_if_slow(start, Duration::from_secs(60), "test") >= Duration::from_millis(5));
    }
}
