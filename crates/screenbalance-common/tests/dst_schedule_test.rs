// Schedules whose preferred time falls on a DST transition must still
// resolve to a firing instant. Runs in its own binary so pinning TZ does
// not race other tests.

use chrono::{Local, TimeZone, Timelike};
use screenbalance_common::schedule::next_fire_time;
use screenbalance_common::EmailReportSchedule;

fn pin_eastern() {
    std::env::set_var("TZ", "America/New_York");
}

#[test]
fn test_daily_schedule_survives_spring_forward_gap() {
    pin_eastern();

    // 2026-03-08: clocks jump from 02:00 to 03:00, so 02:30 does not exist
    let now = Local.with_ymd_and_hms(2026, 3, 8, 0, 30, 0).unwrap();
    let schedule = EmailReportSchedule::daily("user@example.com", "02:30");

    let fire = next_fire_time(&schedule, now).unwrap();
    assert_eq!(fire.date_naive(), now.date_naive());
    // Resolves to the first representable instant after the gap
    assert_eq!(fire.hour(), 3);
    assert_eq!(fire.minute(), 0);
}

#[test]
fn test_ambiguous_fall_back_time_picks_earlier_occurrence() {
    pin_eastern();

    // 2026-11-01: clocks fall back from 02:00 to 01:00, so 01:30 occurs twice
    let now = Local.with_ymd_and_hms(2026, 11, 1, 0, 15, 0).unwrap();
    let schedule = EmailReportSchedule::daily("user@example.com", "01:30");

    let fire = next_fire_time(&schedule, now).unwrap();
    assert_eq!(fire.date_naive(), now.date_naive());
    assert_eq!(fire.hour(), 1);
    assert_eq!(fire.minute(), 30);
    assert!(fire > now);
}

#[test]
fn test_day_after_transition_is_unaffected() {
    pin_eastern();

    let now = Local.with_ymd_and_hms(2026, 3, 9, 1, 0, 0).unwrap();
    let schedule = EmailReportSchedule::daily("user@example.com", "02:30");

    let fire = next_fire_time(&schedule, now).unwrap();
    assert_eq!(fire, Local.with_ymd_and_hms(2026, 3, 9, 2, 30, 0).unwrap());
}
