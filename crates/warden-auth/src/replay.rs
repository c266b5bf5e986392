//! # Replay Guard
//!
//! Timestamp freshness against a symmetric tolerance window. Future-dated
//! timestamps beyond the window are rejected as well, so signed headers
//! cannot be stockpiled ahead of time.

/// Default replay window: five minutes in each direction.
pub const DEFAULT_TOLERANCE_MS: u64 = 300_000;

/// `true` iff `|now_ms - timestamp_ms| <= tolerance_ms`.
pub fn is_fresh(timestamp_ms: i64, now_ms: i64, tolerance_ms: u64) -> bool {
    now_ms.abs_diff(timestamp_ms) <= tolerance_ms
}

/// Parse a decimal epoch-milliseconds header value.
///
/// Accepts an optional leading `-` followed by ASCII digits only. Signs,
/// whitespace, fractions and trailing garbage are malformed.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn same_instant_is_fresh() {
        assert!(is_fresh(NOW, NOW, 0));
        assert!(is_fresh(NOW, NOW, DEFAULT_TOLERANCE_MS));
    }

    #[test]
    fn boundary_is_inclusive() {
        let t = DEFAULT_TOLERANCE_MS as i64;
        assert!(is_fresh(NOW - t, NOW, DEFAULT_TOLERANCE_MS));
        assert!(is_fresh(NOW + t, NOW, DEFAULT_TOLERANCE_MS));
    }

    #[test]
    fn one_past_the_boundary_is_stale() {
        let t = DEFAULT_TOLERANCE_MS as i64;
        assert!(!is_fresh(NOW - t - 1, NOW, DEFAULT_TOLERANCE_MS));
        assert!(!is_fresh(NOW + t + 1, NOW, DEFAULT_TOLERANCE_MS));
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        assert!(!is_fresh(i64::MIN, i64::MAX, DEFAULT_TOLERANCE_MS));
        assert!(!is_fresh(i64::MAX, i64::MIN, u64::MAX - 1));
        assert!(is_fresh(i64::MIN, i64::MAX, u64::MAX));
    }

    #[test]
    fn parses_plain_decimal() {
        assert_eq!(parse_timestamp("1700000000000"), Some(NOW));
        assert_eq!(parse_timestamp("0"), Some(0));
        assert_eq!(parse_timestamp("-5"), Some(-5));
    }

    #[test]
    fn rejects_malformed_values() {
        for raw in ["", "-", "+1", " 1", "1 ", "1.5", "1e3", "abc", "123abc", "0x10"] {
            assert_eq!(parse_timestamp(raw), None, "{raw:?} should be rejected");
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(parse_timestamp("99999999999999999999"), None);
    }

    #[test]
    fn wall_clock_is_after_2023() {
        assert!(unix_millis() > NOW);
    }
}
