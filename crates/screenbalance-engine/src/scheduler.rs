// Report Scheduler
//
// One timer task per email address, armed from a validated schedule.
// Saving a schedule for an address cancels and replaces any existing
// timer for it, so there are never two live timers for the same address.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use screenbalance_common::schedule::{next_fire_time, validate_email, validate_schedule};
use screenbalance_common::{EmailReportSchedule, Error, Result};
use screenbalance_proto::MailComposer;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::aggregate::DailyAggregateStore;
use crate::notifier::NotificationManager;
use crate::report::render_report;
use crate::storage::{StateStore, SCHEDULES_KEY};

pub struct ReportScheduler {
    aggregate: Arc<DailyAggregateStore>,
    composer: Arc<dyn MailComposer>,
    notifier: Arc<NotificationManager>,
    store: StateStore,
    schedules: RwLock<HashMap<String, EmailReportSchedule>>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl ReportScheduler {
    /// Load persisted schedules. Timers are armed separately via
    /// [`ReportScheduler::arm_all`] once the runtime is up.
    pub fn load(
        aggregate: Arc<DailyAggregateStore>,
        composer: Arc<dyn MailComposer>,
        notifier: Arc<NotificationManager>,
        store: StateStore,
    ) -> Self {
        let schedules: Vec<EmailReportSchedule> =
            store.load_json(SCHEDULES_KEY).unwrap_or_default();
        info!("Loaded {} report schedules", schedules.len());

        let schedules = schedules.into_iter().map(|s| (s.email.clone(), s)).collect();
        Self {
            aggregate,
            composer,
            notifier,
            store,
            schedules: RwLock::new(schedules),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Arm timers for every enabled persisted schedule.
    pub async fn arm_all(&self) {
        let schedules: Vec<EmailReportSchedule> =
            self.schedules.read().await.values().cloned().collect();
        for schedule in schedules {
            if schedule.enabled {
                self.arm(schedule).await;
            }
        }
    }

    /// Validate and store a schedule, then cancel-and-replace the timer
    /// for its address. A validation failure leaves prior state untouched.
    pub async fn save_schedule(&self, schedule: EmailReportSchedule) -> Result<()> {
        validate_schedule(&schedule)?;

        {
            let mut schedules = self.schedules.write().await;
            schedules.insert(schedule.email.clone(), schedule.clone());
            self.persist(&schedules)?;
        }

        self.disarm(&schedule.email).await;
        if schedule.enabled {
            self.arm(schedule.clone()).await;
        }

        info!("Saved report schedule for {} ({:?})", schedule.email, schedule.frequency);
        Ok(())
    }

    /// Remove the schedule and cancel its timer. Returns whether a
    /// schedule existed.
    pub async fn remove_schedule(&self, email: &str) -> Result<bool> {
        let removed = {
            let mut schedules = self.schedules.write().await;
            let removed = schedules.remove(email).is_some();
            if removed {
                self.persist(&schedules)?;
            }
            removed
        };

        self.disarm(email).await;
        if removed {
            info!("Removed report schedule for {}", email);
        }
        Ok(removed)
    }

    pub async fn schedules(&self) -> Vec<EmailReportSchedule> {
        let mut schedules: Vec<EmailReportSchedule> =
            self.schedules.read().await.values().cloned().collect();
        schedules.sort_by(|a, b| a.email.cmp(&b.email));
        schedules
    }

    /// One-shot render-and-deliver for any valid address. Does not touch
    /// the recurring schedule.
    pub async fn send_now(&self, email: &str) -> Result<()> {
        validate_email(email)?;
        fire_report(&self.aggregate, self.composer.as_ref(), email).await?;
        self.notifier.send(NotificationManager::report_sent(email));
        Ok(())
    }

    /// Number of live timer tasks. Diagnostics only.
    pub async fn active_timer_count(&self) -> usize {
        self.timers.lock().await.values().filter(|t| !t.is_finished()).count()
    }

    /// Cancel every timer. Idempotent.
    pub async fn shutdown(&self) {
        let mut timers = self.timers.lock().await;
        for (email, task) in timers.drain() {
            debug!("Canceling report timer for {}", email);
            task.abort();
        }
        info!("Report scheduler shut down");
    }

    async fn arm(&self, schedule: EmailReportSchedule) {
        let aggregate = Arc::clone(&self.aggregate);
        let composer = Arc::clone(&self.composer);
        let notifier = Arc::clone(&self.notifier);
        let email = schedule.email.clone();

        let task = tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = match next_fire_time(&schedule, now) {
                    Ok(next) => next,
                    Err(e) => {
                        // Keep the timer alive and try again later rather
                        // than silently dropping the schedule
                        warn!("Cannot compute next fire time for {}: {}", schedule.email, e);
                        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                        continue;
                    }
                };

                let wait = (next - now).to_std().unwrap_or_default();
                debug!("Next report for {} at {} ({:?} away)", schedule.email, next, wait);
                tokio::time::sleep(wait).await;

                match fire_report(&aggregate, composer.as_ref(), &schedule.email).await {
                    Ok(()) => {
                        notifier.send(NotificationManager::report_sent(&schedule.email));
                    }
                    Err(e) => {
                        // Missed fire is not retried; the loop reschedules
                        // the next occurrence immediately
                        warn!("Report delivery to {} failed: {}", schedule.email, e);
                    }
                }
            }
        });

        let mut timers = self.timers.lock().await;
        if let Some(previous) = timers.insert(email, task) {
            previous.abort();
        }
    }

    async fn disarm(&self, email: &str) {
        let mut timers = self.timers.lock().await;
        if let Some(task) = timers.remove(email) {
            task.abort();
        }
    }

    fn persist(&self, schedules: &HashMap<String, EmailReportSchedule>) -> Result<()> {
        let mut list: Vec<&EmailReportSchedule> = schedules.values().collect();
        list.sort_by(|a, b| a.email.cmp(&b.email));
        self.store.save_json(SCHEDULES_KEY, &list)
    }
}

async fn fire_report(
    aggregate: &DailyAggregateStore,
    composer: &dyn MailComposer,
    email: &str,
) -> Result<()> {
    let records = aggregate.records().await;
    let (subject, body) = render_report(&records, Local::now().date_naive());

    composer
        .compose(email, &subject, &body)
        .await
        .map_err(|e| Error::Delivery(e.to_string()))
}
