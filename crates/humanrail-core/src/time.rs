//! Wall-clock helpers
//!
//! Every operation takes `now` as unix seconds from the caller. Nothing in the
//! engine reads the system clock, which keeps validation deterministic.

/// Seconds in a UTC day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Unix timestamp in seconds.
pub type UnixSeconds = i64;

/// Day number used for daily spend windows. Timestamps before the epoch map to day 0.
pub fn day_number(ts: UnixSeconds) -> u32 {
    if ts <= 0 {
        return 0;
    }
    u32::try_from(ts / SECONDS_PER_DAY).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_boundaries() {
        assert_eq!(day_number(0), 0);
        assert_eq!(day_number(SECONDS_PER_DAY - 1), 0);
        assert_eq!(day_number(SECONDS_PER_DAY), 1);
        assert_eq!(day_number(1_700_000_000), 19_675);
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(day_number(-5), 0);
    }
}
