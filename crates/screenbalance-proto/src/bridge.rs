use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw per-app entry as delivered by the native usage-stats layer.
///
/// Only name and minutes are guaranteed; everything else is best effort and
/// unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAppEntry {
    pub name: String,
    #[serde(default)]
    pub minutes: f64,
    #[serde(default)]
    pub category: Option<String>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_used: Option<i64>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Snapshot of the native layer's shared preferences, pulled during
/// background polling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SharedPreferencesSnapshot {
    #[serde(default)]
    pub total_screen_time: f64,
    #[serde(default)]
    pub screen_time_limit: u32,
    #[serde(default)]
    pub notification_frequency: u32,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub last_limit_reached_notification: Option<i64>,
    #[serde(default)]
    pub last_approaching_limit_notification: Option<i64>,
}

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Usage-access permission has not been granted. Callers surface this
    /// as a flag and keep serving cached data.
    #[error("usage permission not granted")]
    PermissionDenied,

    #[error("native call failed: {0}")]
    CallFailed(String),
}

/// The native plugin boundary: usage stats, preferences, and battery
/// optimization controls. All calls are asynchronous and may fail out of
/// band; callers fall back to last-known cached values on error.
#[async_trait]
pub trait UsageBridge: Send + Sync {
    async fn has_usage_permission(&self) -> Result<bool, BridgeError>;

    async fn request_usage_permission(&self) -> Result<(), BridgeError>;

    async fn get_app_usage_data(
        &self,
        start: Option<DateTime<Local>>,
        end: Option<DateTime<Local>>,
    ) -> Result<Vec<RawAppEntry>, BridgeError>;

    async fn get_shared_preferences(&self) -> Result<SharedPreferencesSnapshot, BridgeError>;

    async fn set_screen_time_limit(&self, minutes: u32) -> Result<(), BridgeError>;

    async fn set_notification_frequency(&self, minutes: u32) -> Result<(), BridgeError>;

    async fn is_battery_optimization_exempt(&self) -> Result<bool, BridgeError>;

    async fn request_battery_optimization_exemption(&self) -> Result<(), BridgeError>;
}

/// OS-level mail compose hand-off. Delivery success means "handed off",
/// not "email received"; no network call is made by the core.
#[async_trait]
pub trait MailComposer: Send + Sync {
    async fn compose(&self, to: &str, subject: &str, body: &str) -> Result<(), BridgeError>;
}

/// Scriptable in-memory bridge for tests and the dev harness.
#[derive(Default)]
pub struct MockBridge {
    pub entries: Mutex<Vec<RawAppEntry>>,
    pub preferences: Mutex<SharedPreferencesSnapshot>,
    pub permission_granted: AtomicBool,
    pub battery_exempt: AtomicBool,
    pub fail_calls: AtomicBool,
    pub usage_calls: AtomicUsize,
    pub preference_calls: AtomicUsize,
}

impl MockBridge {
    pub fn new() -> Self {
        let bridge = Self::default();
        bridge.permission_granted.store(true, Ordering::SeqCst);
        bridge
    }

    pub fn with_entries(entries: Vec<RawAppEntry>) -> Self {
        let bridge = Self::new();
        *bridge.entries.lock().unwrap() = entries;
        bridge
    }

    pub fn set_entries(&self, entries: Vec<RawAppEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn set_preferences(&self, prefs: SharedPreferencesSnapshot) {
        *self.preferences.lock().unwrap() = prefs;
    }

    fn check_failure(&self) -> Result<(), BridgeError> {
        if self.fail_calls.load(Ordering::SeqCst) {
            Err(BridgeError::CallFailed("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsageBridge for MockBridge {
    async fn has_usage_permission(&self) -> Result<bool, BridgeError> {
        self.check_failure()?;
        Ok(self.permission_granted.load(Ordering::SeqCst))
    }

    async fn request_usage_permission(&self) -> Result<(), BridgeError> {
        self.check_failure()?;
        self.permission_granted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn get_app_usage_data(
        &self,
        _start: Option<DateTime<Local>>,
        _end: Option<DateTime<Local>>,
    ) -> Result<Vec<RawAppEntry>, BridgeError> {
        self.check_failure()?;
        self.usage_calls.fetch_add(1, Ordering::SeqCst);
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(BridgeError::PermissionDenied);
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn get_shared_preferences(&self) -> Result<SharedPreferencesSnapshot, BridgeError> {
        self.check_failure()?;
        self.preference_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self.preferences.lock().unwrap())
    }

    async fn set_screen_time_limit(&self, minutes: u32) -> Result<(), BridgeError> {
        self.check_failure()?;
        self.preferences.lock().unwrap().screen_time_limit = minutes;
        Ok(())
    }

    async fn set_notification_frequency(&self, minutes: u32) -> Result<(), BridgeError> {
        self.check_failure()?;
        self.preferences.lock().unwrap().notification_frequency = minutes;
        Ok(())
    }

    async fn is_battery_optimization_exempt(&self) -> Result<bool, BridgeError> {
        self.check_failure()?;
        Ok(self.battery_exempt.load(Ordering::SeqCst))
    }

    async fn request_battery_optimization_exemption(&self) -> Result<(), BridgeError> {
        self.check_failure()?;
        self.battery_exempt.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Captures composed mails instead of opening a composer.
#[derive(Default)]
pub struct MockComposer {
    pub sent: Mutex<Vec<(String, String, String)>>,
    pub fail_calls: AtomicBool,
}

impl MockComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailComposer for MockComposer {
    async fn compose(&self, to: &str, subject: &str, body: &str) -> Result<(), BridgeError> {
        if self.fail_calls.load(Ordering::SeqCst) {
            return Err(BridgeError::CallFailed("injected failure".to_string()));
        }
        self.sent.lock().unwrap().push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}
