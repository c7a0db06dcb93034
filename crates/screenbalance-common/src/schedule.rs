// Report Schedule Math
//
// Computes the next fire instant for daily, weekly, and monthly report
// schedules, and validates schedules before they are armed.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime};

use crate::error::{Error, Result};
use crate::types::{EmailReportSchedule, ReportFrequency};

/// Compute the next occurrence of `schedule` strictly after `now`.
pub fn next_fire_time(
    schedule: &EmailReportSchedule,
    now: DateTime<Local>,
) -> Result<DateTime<Local>> {
    let time = parse_time(&schedule.preferred_time)?;

    match schedule.frequency {
        ReportFrequency::Daily => {
            let today = at_local(now.date_naive(), time)?;
            if today > now {
                Ok(today)
            } else {
                at_local(now.date_naive() + Duration::days(1), time)
            }
        }
        ReportFrequency::Weekly => {
            let target = schedule
                .weekly_day
                .ok_or_else(|| Error::InvalidSchedule("weekly schedule missing day".to_string()))?;
            let offset = (target.num_days_from_monday() as i64
                - now.weekday().num_days_from_monday() as i64
                + 7)
                % 7;
            let mut candidate = at_local(now.date_naive() + Duration::days(offset), time)?;
            if candidate <= now {
                candidate = at_local(now.date_naive() + Duration::days(offset + 7), time)?;
            }
            Ok(candidate)
        }
        ReportFrequency::Monthly => {
            let day = schedule.monthly_date.ok_or_else(|| {
                Error::InvalidSchedule("monthly schedule missing date".to_string())
            })?;
            // Day-of-month overflow clamps to the last day of the month, so
            // a schedule for the 31st still fires every month.
            let this_month = monthly_date(now.year(), now.month(), day)?;
            let candidate = at_local(this_month, time)?;
            if candidate > now {
                return Ok(candidate);
            }
            let (next_year, next_month) = if now.month() == 12 {
                (now.year() + 1, 1)
            } else {
                (now.year(), now.month() + 1)
            };
            at_local(monthly_date(next_year, next_month, day)?, time)
        }
    }
}

/// Validate a schedule before arming a timer for it. Rejected schedules
/// never replace prior state.
pub fn validate_schedule(schedule: &EmailReportSchedule) -> Result<()> {
    validate_email(&schedule.email)?;
    parse_time(&schedule.preferred_time)?;

    match schedule.frequency {
        ReportFrequency::Weekly if schedule.weekly_day.is_none() => {
            Err(Error::InvalidSchedule("weekly schedule requires a day of week".to_string()))
        }
        ReportFrequency::Monthly => match schedule.monthly_date {
            None => {
                Err(Error::InvalidSchedule("monthly schedule requires a day of month".to_string()))
            }
            Some(day) if !(1..=31).contains(&day) => Err(Error::InvalidSchedule(format!(
                "day of month must be 1-31, got {}",
                day
            ))),
            Some(_) => Ok(()),
        },
        _ => Ok(()),
    }
}

/// Loose RFC-5322-style check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || Error::InvalidEmail(email.to_string());

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }
    Ok(())
}

/// Parse a time-of-day in "HH:MM".
pub fn parse_time(time_str: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(time_str, "%H:%M")
        .map_err(|e| Error::InvalidTime(format!("{}: {}", time_str, e)))
}

/// Resolve a wall-clock date and time to a local instant. A time inside a
/// DST spring-forward gap has no local representation; it resolves to the
/// first representable instant after the gap. An ambiguous fall-back time
/// resolves to its earlier occurrence.
fn at_local(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>> {
    let mut naive = date.and_time(time);
    for _ in 0..8 {
        if let Some(instant) = naive.and_local_timezone(Local).earliest() {
            return Ok(instant);
        }
        naive += Duration::minutes(15);
    }
    Err(Error::InvalidTime(format!("{} {} has no local representation", date, time)))
}

fn monthly_date(year: i32, month: u32, requested_day: u32) -> Result<NaiveDate> {
    let day = requested_day.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::InvalidTime(format!("invalid date {}-{}-{}", year, month, day)))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Weekday};

    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_time() {
        assert!(parse_time("09:00").is_ok());
        assert!(parse_time("23:59").is_ok());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("invalid").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("a.b+c@sub.example.org").is_ok());
        assert!(validate_email("userexample.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
        assert!(validate_email("user@.example.com").is_err());
        assert!(validate_email("user name@example.com").is_err());
    }

    #[test]
    fn test_daily_before_preferred_time_fires_today() {
        let schedule = EmailReportSchedule::daily("user@example.com", "21:00");
        // Monday, Jan 19, 2026
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 19, 21, 0));
    }

    #[test]
    fn test_daily_after_preferred_time_fires_tomorrow() {
        let schedule = EmailReportSchedule::daily("user@example.com", "09:00");
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 20, 9, 0));
    }

    #[test]
    fn test_daily_at_exact_preferred_time_fires_tomorrow() {
        let schedule = EmailReportSchedule::daily("user@example.com", "09:00");
        let now = local(2026, 1, 19, 9, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 20, 9, 0));
    }

    #[test]
    fn test_weekly_same_day_after_time_fires_next_week() {
        let schedule = EmailReportSchedule::weekly("user@example.com", "09:00", Weekday::Mon);
        // Monday, Jan 19, 2026 at 10:00 -> following Monday, not today
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 26, 9, 0));
    }

    #[test]
    fn test_weekly_later_in_week() {
        let schedule = EmailReportSchedule::weekly("user@example.com", "09:00", Weekday::Fri);
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 23, 9, 0));
    }

    #[test]
    fn test_monthly_this_month_if_not_passed() {
        let schedule = EmailReportSchedule::monthly("user@example.com", "08:00", 25);
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 1, 25, 8, 0));
    }

    #[test]
    fn test_monthly_rolls_to_next_month() {
        let schedule = EmailReportSchedule::monthly("user@example.com", "08:00", 10);
        let now = local(2026, 1, 19, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 2, 10, 8, 0));
    }

    #[test]
    fn test_monthly_day_overflow_clamps_to_month_end() {
        let schedule = EmailReportSchedule::monthly("user@example.com", "08:00", 31);
        // February 2026 has 28 days
        let now = local(2026, 2, 1, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2026, 2, 28, 8, 0));
    }

    #[test]
    fn test_monthly_december_wraps_year() {
        let schedule = EmailReportSchedule::monthly("user@example.com", "08:00", 5);
        let now = local(2026, 12, 20, 10, 0);
        let fire = next_fire_time(&schedule, now).unwrap();
        assert_eq!(fire, local(2027, 1, 5, 8, 0));
    }

    #[test]
    fn test_validate_schedule_requires_conditional_fields() {
        let mut weekly = EmailReportSchedule::weekly("user@example.com", "09:00", Weekday::Mon);
        assert!(validate_schedule(&weekly).is_ok());
        weekly.weekly_day = None;
        assert!(validate_schedule(&weekly).is_err());

        let mut monthly = EmailReportSchedule::monthly("user@example.com", "09:00", 15);
        assert!(validate_schedule(&monthly).is_ok());
        monthly.monthly_date = Some(32);
        assert!(validate_schedule(&monthly).is_err());
        monthly.monthly_date = None;
        assert!(validate_schedule(&monthly).is_err());
    }

    #[test]
    fn test_validate_schedule_rejects_bad_email_and_time() {
        let mut schedule = EmailReportSchedule::daily("not-an-email", "09:00");
        assert!(matches!(validate_schedule(&schedule), Err(Error::InvalidEmail(_))));

        schedule.email = "user@example.com".to_string();
        schedule.preferred_time = "9am".to_string();
        assert!(matches!(validate_schedule(&schedule), Err(Error::InvalidTime(_))));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2026, 1), 31);
        assert_eq!(days_in_month(2026, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2026, 4), 30);
        assert_eq!(days_in_month(2026, 12), 31);
    }
}
