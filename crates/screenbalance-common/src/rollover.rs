// Day Boundary Detection
//
// The daily aggregate resets at local-calendar midnight. Rollover is
// detected by comparing a persisted reset date against the current day, and
// is checked both at startup and from a recurring timer so a rollover is
// not missed while the process stays alive across midnight.

use chrono::{DateTime, Local, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a timestamp as the stored day key.
pub fn day_key(now: DateTime<Local>) -> String {
    now.format(DATE_FORMAT).to_string()
}

/// True when the calendar day has changed since the stored reset date.
///
/// An absent or unparseable stored date counts as rolled over, forcing a
/// reset to a known state.
pub fn has_day_rolled_over(last_reset_date: Option<&str>, now: DateTime<Local>) -> bool {
    let stored = match last_reset_date {
        Some(s) => s,
        None => return true,
    };

    match NaiveDate::parse_from_str(stored, DATE_FORMAT) {
        Ok(date) => date != now.date_naive(),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_same_day_is_not_rolled_over() {
        let now = Local.with_ymd_and_hms(2026, 1, 19, 23, 59, 0).unwrap();
        assert!(!has_day_rolled_over(Some("2026-01-19"), now));
    }

    #[test]
    fn test_previous_day_is_rolled_over() {
        let now = Local.with_ymd_and_hms(2026, 1, 20, 0, 1, 0).unwrap();
        assert!(has_day_rolled_over(Some("2026-01-19"), now));
    }

    #[test]
    fn test_missing_or_garbage_date_forces_rollover() {
        let now = Local.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap();
        assert!(has_day_rolled_over(None, now));
        assert!(has_day_rolled_over(Some("not-a-date"), now));
        assert!(has_day_rolled_over(Some(""), now));
    }

    #[test]
    fn test_day_key_round_trips() {
        let now = Local.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap();
        let key = day_key(now);
        assert_eq!(key, "2026-01-19");
        assert!(!has_day_rolled_over(Some(&key), now));
    }
}
