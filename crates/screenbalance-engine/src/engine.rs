// Composition Root
//
// Explicitly constructed, dependency-injected wiring of the store,
// evaluator, poll coordinator, and report scheduler. One instance per
// process by construction here, not by static accessors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use screenbalance_common::{AppUsageRecord, LimitConfig, TrackerStatus};
use screenbalance_proto::{BridgeEvent, MailComposer, UsageBridge};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{info, warn};

use crate::aggregate::DailyAggregateStore;
use crate::config::EngineConfig;
use crate::evaluator::LimitEvaluator;
use crate::normalizer;
use crate::notifier::NotificationManager;
use crate::poller::PollCoordinator;
use crate::scheduler::ReportScheduler;
use crate::storage::{StateStore, COOLDOWNS_KEY, LIMIT_KEY};

pub struct Engine {
    config: EngineConfig,
    bridge: Arc<dyn UsageBridge>,
    aggregate: Arc<DailyAggregateStore>,
    poller: Arc<PollCoordinator>,
    scheduler: Arc<ReportScheduler>,
    limit: Arc<RwLock<LimitConfig>>,
    store: StateStore,
    rollover_task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        bridge: Arc<dyn UsageBridge>,
        composer: Arc<dyn MailComposer>,
    ) -> Result<Self> {
        config.validate().context("Engine configuration is invalid")?;

        let store = StateStore::new(config.storage.data_dir.clone())
            .context("Failed to open state store")?;

        let aggregate = Arc::new(DailyAggregateStore::load(store.clone()));

        let cooldowns = store.load_json(COOLDOWNS_KEY).unwrap_or_default();
        let evaluator = LimitEvaluator::new(config.notifications.cooldown_minutes, cooldowns);

        let mut limit_config: LimitConfig = store.load_json(LIMIT_KEY).unwrap_or_default();
        limit_config.notifications_enabled =
            limit_config.notifications_enabled && config.notifications.enabled;
        let limit = Arc::new(RwLock::new(limit_config));

        let notifier = Arc::new(NotificationManager::new());

        let poller = Arc::new(PollCoordinator::new(
            Arc::clone(&bridge),
            Arc::clone(&aggregate),
            evaluator,
            Arc::clone(&notifier),
            store.clone(),
            Arc::clone(&limit),
            Duration::from_secs(config.tracking.background_poll_secs),
            Duration::from_secs(config.tracking.foreground_tick_secs),
            Duration::from_millis(config.tracking.debounce_ms),
        ));

        let scheduler = Arc::new(ReportScheduler::load(
            Arc::clone(&aggregate),
            composer,
            notifier,
            store.clone(),
        ));

        Ok(Self {
            config,
            bridge,
            aggregate,
            poller,
            scheduler,
            limit,
            store,
            rollover_task: Mutex::new(None),
        })
    }

    /// Startup sequence: rollover check, initial snapshot pull, recurring
    /// rollover timer, and arming of persisted report schedules.
    pub async fn start(&self) -> Result<()> {
        info!("Starting screenbalance engine");

        self.aggregate
            .check_rollover(Local::now())
            .await
            .context("Startup rollover check failed")?;

        if !self.update_usage_data().await {
            warn!("Initial usage snapshot unavailable, serving cached aggregate");
        }

        self.start_rollover_task().await;
        self.scheduler.arm_all().await;

        info!("Engine started");
        Ok(())
    }

    /// Pull a fresh snapshot from the native layer into the aggregate.
    ///
    /// Returns false when permission is missing or the native call fails;
    /// the cached aggregate keeps serving the UI in both cases.
    pub async fn update_usage_data(&self) -> bool {
        match self.bridge.has_usage_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Usage permission not granted, keeping cached data");
                return false;
            }
            Err(e) => {
                warn!("Permission check failed: {}, keeping cached data", e);
                return false;
            }
        }

        let entries = match self.bridge.get_app_usage_data(None, None).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Native usage call failed: {}, keeping cached data", e);
                return false;
            }
        };

        let records = normalizer::normalize_entries(entries);
        if let Err(e) = self.aggregate.merge(records).await {
            warn!("Failed to merge usage snapshot: {}", e);
            return false;
        }

        let total = self.aggregate.total_minutes().await;
        self.poller.evaluate_total(total).await;
        true
    }

    /// Register which app the host currently shows in the foreground. The
    /// live tick attributes its elapsed time to this app while the process
    /// is foregrounded.
    pub async fn set_foreground_app(&self, name: Option<String>) {
        self.poller.set_foreground_app(name).await;
    }

    /// Add locally observed foreground time and re-evaluate the limit.
    pub async fn record_active_tick(&self, app_name: &str, elapsed_minutes: f64) {
        if let Err(e) = self.aggregate.record_active_tick(app_name, elapsed_minutes).await {
            warn!("Failed to record active tick for {}: {}", app_name, e);
            return;
        }
        let total = self.aggregate.total_minutes().await;
        self.poller.evaluate_total(total).await;
    }

    /// Consume bridge events until the sender side closes.
    pub async fn run_event_loop(&self, mut events: mpsc::UnboundedReceiver<BridgeEvent>) {
        while let Some(event) = events.recv().await {
            self.poller.handle_event(event).await;
        }
        info!("Bridge event channel closed");
    }

    pub async fn total_screen_time(&self) -> f64 {
        self.aggregate.total_minutes().await
    }

    pub async fn app_usage_data(&self) -> Vec<AppUsageRecord> {
        self.aggregate.records().await
    }

    pub async fn tracker_status(&self) -> TrackerStatus {
        self.poller.status().await
    }

    pub async fn limit_config(&self) -> LimitConfig {
        *self.limit.read().await
    }

    /// Persist a new limit configuration and push the knobs to the native
    /// layer. A failed native call keeps the local value and is retried
    /// implicitly on the next poll cycle.
    pub async fn set_limit_config(&self, config: LimitConfig) {
        let config = config.clamped();
        *self.limit.write().await = config;

        if let Err(e) = self.store.save_json(LIMIT_KEY, &config) {
            warn!("Failed to persist limit config: {}", e);
        }
        if let Err(e) = self.bridge.set_screen_time_limit(config.screen_time_limit_minutes).await {
            warn!("Failed to push screen time limit to native layer: {}", e);
        }
        if let Err(e) =
            self.bridge.set_notification_frequency(config.notification_frequency_minutes).await
        {
            warn!("Failed to push notification frequency to native layer: {}", e);
        }
    }

    /// User-triggered reset of the daily aggregate.
    pub async fn reset_daily(&self) {
        if let Err(e) = self.aggregate.reset_daily().await {
            warn!("Manual daily reset failed to persist: {}", e);
        }
    }

    pub fn scheduler(&self) -> &ReportScheduler {
        &self.scheduler
    }

    pub fn poller(&self) -> &PollCoordinator {
        &self.poller
    }

    pub fn aggregate(&self) -> &DailyAggregateStore {
        &self.aggregate
    }

    async fn start_rollover_task(&self) {
        let aggregate = Arc::clone(&self.aggregate);
        let period = Duration::from_secs(self.config.tracking.rollover_check_secs);

        let mut task_slot = self.rollover_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }

        *task_slot = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match aggregate.check_rollover(Local::now()).await {
                    Ok(true) => info!("Day rolled over, aggregate reset"),
                    Ok(false) => {}
                    Err(e) => warn!("Rollover check failed: {}", e),
                }
            }
        }));
    }

    /// Tear down every recurring task. Idempotent and exception-safe:
    /// a second call finds nothing left to cancel.
    pub async fn shutdown(&self) {
        self.poller.shutdown().await;
        self.scheduler.shutdown().await;

        let mut task_slot = self.rollover_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }
        info!("Engine shut down");
    }
}
