use chrono::{DateTime, Local, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Usage categories for tracked applications.
///
/// Each category carries a weight used by the productivity score and a
/// fixed display color used by the report renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppCategory {
    SocialMedia,
    Entertainment,
    Productivity,
    Games,
    Education,
    Communication,
    Other,
}

impl AppCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AppCategory::SocialMedia => "Social Media",
            AppCategory::Entertainment => "Entertainment",
            AppCategory::Productivity => "Productivity",
            AppCategory::Games => "Games",
            AppCategory::Education => "Education",
            AppCategory::Communication => "Communication",
            AppCategory::Other => "Other",
        }
    }

    /// Weight applied per minute when computing the productivity score.
    pub fn productivity_weight(&self) -> f64 {
        match self {
            AppCategory::Productivity | AppCategory::Education => 1.0,
            AppCategory::Communication => 0.5,
            AppCategory::SocialMedia | AppCategory::Entertainment => -0.5,
            AppCategory::Games => -1.0,
            AppCategory::Other => 0.0,
        }
    }

    pub fn all() -> [AppCategory; 7] {
        [
            AppCategory::SocialMedia,
            AppCategory::Entertainment,
            AppCategory::Productivity,
            AppCategory::Games,
            AppCategory::Education,
            AppCategory::Communication,
            AppCategory::Other,
        ]
    }
}

/// Per-app usage for a single calendar day.
///
/// The app name is the unique key within a day; `minutes` is the cumulative
/// daily total and only decreases on an explicit reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUsageRecord {
    /// Display name, unique per app within a day
    pub name: String,
    /// Cumulative usage for the day, in minutes
    pub minutes: f64,
    pub category: AppCategory,
    /// Last time the app was observed in the foreground
    pub last_used: Option<DateTime<Local>>,
    /// Opaque icon blob (data-URI style); carried, never inspected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// True while the app is the foreground app being live-tracked
    #[serde(default)]
    pub is_active: bool,
}

impl AppUsageRecord {
    pub fn new(name: impl Into<String>, minutes: f64, category: AppCategory) -> Self {
        Self { name: name.into(), minutes, category, last_used: None, icon: None, is_active: false }
    }
}

/// User-configured screen time limit and notification cadence.
///
/// Owned by the settings surface; the core reads it, never originates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Daily screen time limit in minutes, 5..=1440
    pub screen_time_limit_minutes: u32,
    /// How close to the limit (in minutes) the approaching warning fires, 5..=60
    pub notification_frequency_minutes: u32,
    pub notifications_enabled: bool,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            screen_time_limit_minutes: 120,
            notification_frequency_minutes: 15,
            notifications_enabled: true,
        }
    }
}

impl LimitConfig {
    /// Returns a copy with both knobs forced into their valid ranges.
    pub fn clamped(&self) -> Self {
        Self {
            screen_time_limit_minutes: self.screen_time_limit_minutes.clamp(5, 1440),
            notification_frequency_minutes: self.notification_frequency_minutes.clamp(5, 60),
            notifications_enabled: self.notifications_enabled,
        }
    }
}

/// Timestamps of the most recent limit notifications, persisted so that
/// cooldowns survive a process restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationCooldownState {
    pub last_approaching_fired_at: Option<DateTime<Local>>,
    pub last_limit_reached_fired_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// A recurring email usage report.
///
/// One active schedule per email address; re-saving with the same address
/// replaces the prior schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReportSchedule {
    pub id: Uuid,
    pub email: String,
    pub frequency: ReportFrequency,
    /// Fire time of day in "HH:MM"
    pub preferred_time: String,
    /// Required iff frequency is weekly
    pub weekly_day: Option<Weekday>,
    /// Day of month 1..=31, required iff frequency is monthly
    pub monthly_date: Option<u32>,
    pub enabled: bool,
}

impl EmailReportSchedule {
    pub fn daily(email: impl Into<String>, preferred_time: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            frequency: ReportFrequency::Daily,
            preferred_time: preferred_time.into(),
            weekly_day: None,
            monthly_date: None,
            enabled: true,
        }
    }

    pub fn weekly(
        email: impl Into<String>,
        preferred_time: impl Into<String>,
        day: Weekday,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            frequency: ReportFrequency::Weekly,
            preferred_time: preferred_time.into(),
            weekly_day: Some(day),
            monthly_date: None,
            enabled: true,
        }
    }

    pub fn monthly(
        email: impl Into<String>,
        preferred_time: impl Into<String>,
        day_of_month: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            frequency: ReportFrequency::Monthly,
            preferred_time: preferred_time.into(),
            weekly_day: None,
            monthly_date: Some(day_of_month),
            enabled: true,
        }
    }
}

/// Read-only diagnostics projection of the background poll coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerStatus {
    pub is_tracking: bool,
    pub update_interval_ms: u64,
    pub last_update_time: Option<DateTime<Local>>,
    pub last_background_update_time: Option<DateTime<Local>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_config_clamped() {
        let config = LimitConfig {
            screen_time_limit_minutes: 2000,
            notification_frequency_minutes: 2,
            notifications_enabled: true,
        };
        let clamped = config.clamped();
        assert_eq!(clamped.screen_time_limit_minutes, 1440);
        assert_eq!(clamped.notification_frequency_minutes, 5);
    }

    #[test]
    fn test_category_weights() {
        assert_eq!(AppCategory::Productivity.productivity_weight(), 1.0);
        assert_eq!(AppCategory::Games.productivity_weight(), -1.0);
        assert_eq!(AppCategory::Other.productivity_weight(), 0.0);
    }

    #[test]
    fn test_category_serde_rename() {
        let json = serde_json::to_string(&AppCategory::SocialMedia).unwrap();
        assert_eq!(json, "\"social_media\"");
    }

    #[test]
    fn test_record_round_trip() {
        let mut record = AppUsageRecord::new("Chrome", 30.0, AppCategory::Productivity);
        record.last_used = Some(Local::now());

        let json = serde_json::to_string(&record).unwrap();
        let back: AppUsageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
