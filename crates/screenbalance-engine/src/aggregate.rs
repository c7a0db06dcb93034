// Daily Aggregate Store
//
// Process-wide owner of the current day's per-app usage records. All
// mutation goes through merge/tick/reset; every mutation persists
// synchronously before the lock is released, and no mutation awaits
// mid-flight, so concurrent timer callbacks never observe torn state.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use screenbalance_common::rollover::{day_key, has_day_rolled_over};
use screenbalance_common::{AppUsageRecord, Result};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::storage::{StateStore, AGGREGATE_KEY, LAST_RESET_DATE_KEY};

pub struct DailyAggregateStore {
    inner: RwLock<Inner>,
    store: StateStore,
}

struct Inner {
    records: HashMap<String, AppUsageRecord>,
    last_reset_date: Option<String>,
}

impl DailyAggregateStore {
    /// Load persisted records and the last reset date from the store.
    pub fn load(store: StateStore) -> Self {
        let records: Vec<AppUsageRecord> =
            store.load_json(AGGREGATE_KEY).unwrap_or_default();
        let last_reset_date = store.load_string(LAST_RESET_DATE_KEY);

        info!(
            "Loaded daily aggregate: {} records, last reset {:?}",
            records.len(),
            last_reset_date
        );

        let records = records.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self { inner: RwLock::new(Inner { records, last_reset_date }), store }
    }

    /// Upsert authoritative native snapshot records by app name.
    ///
    /// Each native snapshot already carries cumulative daily totals, so
    /// `minutes` is replaced, not summed. Category and icon are
    /// last-write-wins; `last_used` keeps the newer of the two values and
    /// the live-tracking flag is left untouched.
    pub async fn merge(&self, records: Vec<AppUsageRecord>) -> Result<()> {
        use std::collections::hash_map::Entry;

        let mut inner = self.inner.write().await;

        for incoming in records {
            match inner.records.entry(incoming.name.clone()) {
                Entry::Occupied(mut occupied) => {
                    let existing = occupied.get_mut();
                    existing.minutes = incoming.minutes;
                    existing.category = incoming.category;
                    if incoming.icon.is_some() {
                        existing.icon = incoming.icon;
                    }
                    existing.last_used = match (existing.last_used, incoming.last_used) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        (a, b) => b.or(a),
                    };
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(incoming);
                }
            }
        }

        self.persist(&inner)
    }

    /// Add locally observed foreground time to a record, creating it if
    /// absent. Used by the in-app live-tracking path between snapshots.
    pub async fn record_active_tick(&self, app_name: &str, elapsed_minutes: f64) -> Result<()> {
        if elapsed_minutes <= 0.0 {
            return Ok(());
        }

        let now = Local::now();
        let mut inner = self.inner.write().await;

        let record = inner.records.entry(app_name.to_string()).or_insert_with(|| {
            AppUsageRecord::new(
                app_name,
                0.0,
                screenbalance_common::category::classify(app_name),
            )
        });
        record.minutes += elapsed_minutes;
        record.is_active = true;
        record.last_used = Some(now);

        self.persist(&inner)
    }

    /// Sum of minutes for records whose `last_used` falls within the
    /// current calendar day. Records without `last_used` or outside today
    /// stay stored but do not count.
    pub async fn total_minutes(&self) -> f64 {
        self.total_minutes_at(Local::now()).await
    }

    pub async fn total_minutes_at(&self, now: DateTime<Local>) -> f64 {
        let inner = self.inner.read().await;
        let today = now.date_naive();

        inner
            .records
            .values()
            .filter(|r| r.last_used.map(|t| t.date_naive() == today).unwrap_or(false))
            .map(|r| r.minutes)
            .sum()
    }

    /// Snapshot of all records for the UI and report layers.
    pub async fn records(&self) -> Vec<AppUsageRecord> {
        let inner = self.inner.read().await;
        let mut records: Vec<AppUsageRecord> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| b.minutes.partial_cmp(&a.minutes).unwrap_or(std::cmp::Ordering::Equal));
        records
    }

    /// Zero all minutes, clear activity markers, keep known app names, and
    /// stamp today as the last reset date.
    pub async fn reset_daily(&self) -> Result<()> {
        self.reset_daily_at(Local::now()).await
    }

    pub async fn reset_daily_at(&self, now: DateTime<Local>) -> Result<()> {
        let mut inner = self.inner.write().await;

        for record in inner.records.values_mut() {
            record.minutes = 0.0;
            record.is_active = false;
            record.last_used = None;
        }
        inner.last_reset_date = Some(day_key(now));

        info!("Daily aggregate reset for {}", day_key(now));
        self.persist(&inner)
    }

    /// Reset if the calendar day has changed since the stored reset date.
    /// Called at startup and from a recurring timer of at most one minute.
    ///
    /// Returns true when a reset happened.
    pub async fn check_rollover(&self, now: DateTime<Local>) -> Result<bool> {
        let rolled = {
            let inner = self.inner.read().await;
            has_day_rolled_over(inner.last_reset_date.as_deref(), now)
        };

        if rolled {
            debug!("Day boundary crossed, resetting aggregate");
            self.reset_daily_at(now).await?;
        }
        Ok(rolled)
    }

    pub async fn last_reset_date(&self) -> Option<String> {
        self.inner.read().await.last_reset_date.clone()
    }

    fn persist(&self, inner: &Inner) -> Result<()> {
        let mut records: Vec<&AppUsageRecord> = inner.records.values().collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        self.store.save_json(AGGREGATE_KEY, &records)?;
        if let Some(date) = &inner.last_reset_date {
            self.store.save_string(LAST_RESET_DATE_KEY, date)?;
        }
        Ok(())
    }
}
