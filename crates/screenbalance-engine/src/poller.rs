// Background Poll Coordinator
//
// Bridges native lifecycle signals into the normalizer, aggregate store,
// and limit evaluator. While the app is backgrounded a recurring poll
// pulls the native preferences snapshot; while foregrounded a faster tick
// accumulates live usage for the registered foreground app and the poll
// is stopped. Downstream update callbacks are debounced.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use screenbalance_common::{LimitConfig, TrackerStatus};
use screenbalance_proto::{BridgeEvent, SharedPreferencesSnapshot, UsageBridge};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::aggregate::DailyAggregateStore;
use crate::evaluator::{LimitEvaluator, LimitEvent};
use crate::normalizer;
use crate::notifier::NotificationManager;
use crate::storage::{StateStore, COOLDOWNS_KEY, LIMIT_KEY};

pub type UpdateCallback = Box<dyn Fn(SharedPreferencesSnapshot) + Send + Sync>;

struct PollShared {
    bridge: Arc<dyn UsageBridge>,
    evaluator: Mutex<LimitEvaluator>,
    notifier: Arc<NotificationManager>,
    store: StateStore,
    limit: Arc<RwLock<LimitConfig>>,
    callback: RwLock<Option<UpdateCallback>>,
    status: RwLock<TrackerStatus>,
    cached_prefs: RwLock<SharedPreferencesSnapshot>,
    foreground_app: RwLock<Option<String>>,
    last_callback_at: RwLock<Option<Instant>>,
    debounce: Duration,
}

pub struct PollCoordinator {
    shared: Arc<PollShared>,
    aggregate: Arc<DailyAggregateStore>,
    poll_interval: Duration,
    tick_interval: Duration,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

impl PollCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bridge: Arc<dyn UsageBridge>,
        aggregate: Arc<DailyAggregateStore>,
        evaluator: LimitEvaluator,
        notifier: Arc<NotificationManager>,
        store: StateStore,
        limit: Arc<RwLock<LimitConfig>>,
        poll_interval: Duration,
        tick_interval: Duration,
        debounce: Duration,
    ) -> Self {
        let status = TrackerStatus {
            is_tracking: false,
            update_interval_ms: poll_interval.as_millis() as u64,
            last_update_time: None,
            last_background_update_time: None,
        };

        Self {
            shared: Arc::new(PollShared {
                bridge,
                evaluator: Mutex::new(evaluator),
                notifier,
                store,
                limit,
                callback: RwLock::new(None),
                status: RwLock::new(status),
                cached_prefs: RwLock::new(SharedPreferencesSnapshot::default()),
                foreground_app: RwLock::new(None),
                last_callback_at: RwLock::new(None),
                debounce,
            }),
            aggregate,
            poll_interval,
            tick_interval,
            poll_task: Mutex::new(None),
            tick_task: Mutex::new(None),
        }
    }

    /// Register the downstream update callback. At most one is held; it is
    /// invoked at most once per debounce window.
    pub async fn register_callback(&self, callback: UpdateCallback) {
        *self.shared.callback.write().await = Some(callback);
    }

    /// Route a native event into the pipeline.
    pub async fn handle_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::AppStateChanged { is_active, .. } => {
                if is_active {
                    info!("App foregrounded, switching to live tick");
                    self.stop_background_poll().await;
                    self.start_foreground_tick().await;
                } else {
                    info!("App backgrounded, starting background poll");
                    self.stop_foreground_tick().await;
                    self.start_background_poll().await;
                }
            }
            BridgeEvent::UsageUpdated { payload, .. } => {
                let records = normalizer::normalize(&payload);
                if records.is_empty() {
                    debug!("Usage update carried no usable records");
                } else if let Err(e) = self.aggregate.merge(records).await {
                    warn!("Failed to merge usage update: {}", e);
                }

                self.shared.status.write().await.last_update_time = Some(Local::now());
                self.shared.notify_downstream().await;
            }
        }
    }

    /// Start the recurring background poll. Any previous poll task is
    /// canceled first so there is never more than one live timer.
    pub async fn start_background_poll(&self) {
        let mut task_slot = self.poll_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }

        let shared = Arc::clone(&self.shared);
        let poll_interval = self.poll_interval;

        shared.status.write().await.is_tracking = true;

        *task_slot = Some(tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            // The first tick completes immediately; skip it so the poll
            // cadence starts one interval after backgrounding
            ticker.tick().await;

            loop {
                ticker.tick().await;
                shared.poll_once().await;
            }
        }));
    }

    /// Stop the recurring poll. Safe to call repeatedly.
    pub async fn stop_background_poll(&self) {
        let mut task_slot = self.poll_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }
        self.shared.status.write().await.is_tracking = false;
    }

    /// Register which app is currently in the foreground. While set, each
    /// live tick attributes its elapsed time to that app.
    pub async fn set_foreground_app(&self, name: Option<String>) {
        *self.shared.foreground_app.write().await = name;
    }

    /// Start the in-app live tick: a faster loop that accumulates time for
    /// the registered foreground app and re-evaluates the limit. Any
    /// previous tick task is canceled first.
    pub async fn start_foreground_tick(&self) {
        let mut task_slot = self.tick_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }

        let shared = Arc::clone(&self.shared);
        let aggregate = Arc::clone(&self.aggregate);
        let tick_interval = self.tick_interval;
        let tick_minutes = tick_interval.as_secs_f64() / 60.0;

        *task_slot = Some(tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let app = shared.foreground_app.read().await.clone();
                if let Some(name) = app {
                    if let Err(e) = aggregate.record_active_tick(&name, tick_minutes).await {
                        warn!("Failed to record live tick for {}: {}", name, e);
                    }
                }

                let total = aggregate.total_minutes().await;
                let config = *shared.limit.read().await;
                shared.evaluate_and_notify(total, &config, Local::now()).await;
                shared.status.write().await.last_update_time = Some(Local::now());
            }
        }));
    }

    /// Stop the live tick. Safe to call repeatedly.
    pub async fn stop_foreground_tick(&self) {
        let mut task_slot = self.tick_task.lock().await;
        if let Some(task) = task_slot.take() {
            task.abort();
        }
    }

    /// Evaluate a locally computed total against the limit. Used by the
    /// snapshot-pull path, which bypasses both recurring loops.
    pub async fn evaluate_total(&self, total_minutes: f64) {
        let config = *self.shared.limit.read().await;
        self.shared.evaluate_and_notify(total_minutes, &config, Local::now()).await;
    }

    /// Diagnostics projection; read-only, not a control surface.
    pub async fn status(&self) -> TrackerStatus {
        *self.shared.status.read().await
    }

    /// Cancel both recurring tasks and drop the registered callback.
    /// Idempotent; leaving any behind would leak a timer or listener.
    pub async fn shutdown(&self) {
        self.stop_background_poll().await;
        self.stop_foreground_tick().await;
        *self.shared.callback.write().await = None;
        info!("Poll coordinator shut down");
    }
}

impl PollShared {
    async fn poll_once(&self) {
        let prefs = match self.bridge.get_shared_preferences().await {
            Ok(prefs) => {
                *self.cached_prefs.write().await = prefs;
                prefs
            }
            Err(e) => {
                // Fall back to the last-known snapshot rather than skipping
                // the evaluation cycle entirely
                warn!("Native preferences call failed, using cached snapshot: {}", e);
                *self.cached_prefs.read().await
            }
        };

        // The native layer owns the authoritative limit knobs; fold them
        // into the shared config, keeping the local enabled flag
        let config = {
            let mut limit = self.limit.write().await;
            let before = *limit;
            if prefs.screen_time_limit > 0 {
                limit.screen_time_limit_minutes = prefs.screen_time_limit;
            }
            if prefs.notification_frequency > 0 {
                limit.notification_frequency_minutes = prefs.notification_frequency;
            }
            if *limit != before {
                // Persist so a restart does not revert to stale knobs
                if let Err(e) = self.store.save_json(LIMIT_KEY, &*limit) {
                    warn!("Failed to persist limit config: {}", e);
                }
            }
            *limit
        };

        let now = Local::now();
        self.evaluate_and_notify(prefs.total_screen_time, &config, now).await;

        self.status.write().await.last_background_update_time = Some(now);
        self.notify_downstream().await;
    }

    async fn evaluate_and_notify(
        &self,
        total_minutes: f64,
        config: &LimitConfig,
        now: chrono::DateTime<Local>,
    ) {
        let event = {
            let mut evaluator = self.evaluator.lock().await;
            let event = evaluator.evaluate(total_minutes, config, now);
            if event.is_some() {
                if let Err(e) = self.store.save_json(COOLDOWNS_KEY, &evaluator.cooldown_state()) {
                    warn!("Failed to persist cooldown state: {}", e);
                }
            }
            event
        };

        match event {
            Some(LimitEvent::ApproachingLimit { minutes_remaining }) => {
                self.notifier.send(NotificationManager::approaching_limit(minutes_remaining));
            }
            Some(LimitEvent::LimitReached { total_minutes }) => {
                self.notifier.send(NotificationManager::limit_reached(
                    total_minutes,
                    config.screen_time_limit_minutes,
                ));
            }
            None => {}
        }
    }

    /// Invoke the registered callback unless one already ran inside the
    /// debounce window; coalesced arrivals still updated cached state.
    async fn notify_downstream(&self) {
        {
            let last = self.last_callback_at.read().await;
            if let Some(at) = *last {
                if at.elapsed() < self.debounce {
                    debug!("Coalescing downstream update inside debounce window");
                    return;
                }
            }
        }

        let callback = self.callback.read().await;
        if let Some(cb) = callback.as_ref() {
            let prefs = *self.cached_prefs.read().await;
            cb(prefs);
            *self.last_callback_at.write().await = Some(Instant::now());
        }
    }
}
