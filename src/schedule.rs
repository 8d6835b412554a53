//! Daily-trigger time arithmetic.
//!
//! The scheduled crawl fires once per day at a fixed local wall-clock
//! time and covers exactly the previous calendar day. This module keeps
//! the time math pure so it can be tested without sleeping; the actual
//! wait-and-fire loop lives in the binary.

use crate::error::TimeError;
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Parse the configured daily trigger time, strict `HH:MM`.
pub fn parse_schedule_time(input: &str) -> Result<NaiveTime, TimeError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| TimeError(input.trim().to_string()))
}

/// How long to sleep from `now` until the next occurrence of `at`.
///
/// Today's occurrence if it is still ahead, otherwise tomorrow's.
pub fn next_wait(now: NaiveDateTime, at: NaiveTime) -> std::time::Duration {
    let today_run = now.date().and_time(at);
    let next = if now < today_run {
        today_run
    } else {
        today_run + Duration::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn moment(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_schedule_time() {
        assert_eq!(parse_schedule_time("08:30").unwrap(), at(8, 30));
        assert_eq!(parse_schedule_time(" 23:59 ").unwrap(), at(23, 59));
    }

    #[test]
    fn test_parse_schedule_time_rejects_bad_input() {
        assert!(parse_schedule_time("8 o'clock").is_err());
        assert!(parse_schedule_time("25:00").is_err());
        assert!(parse_schedule_time("").is_err());
    }

    #[test]
    fn test_next_wait_same_day_when_time_ahead() {
        let wait = next_wait(moment(6, 0, 0), at(8, 30));
        assert_eq!(wait, std::time::Duration::from_secs(2 * 3600 + 30 * 60));
    }

    #[test]
    fn test_next_wait_rolls_to_tomorrow_when_time_passed() {
        let wait = next_wait(moment(9, 0, 0), at(8, 30));
        assert_eq!(
            wait,
            std::time::Duration::from_secs(23 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn test_next_wait_exact_hit_waits_a_full_day() {
        let wait = next_wait(moment(8, 30, 0), at(8, 30));
        assert_eq!(wait, std::time::Duration::from_secs(24 * 3600));
    }
}
