// Limit/Notification Evaluator
//
// Per-kind state machine: Idle -> Fired -> Cooldown -> Idle. The cooldown
// gates re-firing even while the triggering condition stays true, so usage
// hovering at the threshold does not spam notifications. Fired timestamps
// are recorded before the notification hand-off and never rolled back:
// at-most-once delivery.

use chrono::{DateTime, Duration, Local};
use screenbalance_common::{LimitConfig, NotificationCooldownState};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitEvent {
    ApproachingLimit { minutes_remaining: u32 },
    LimitReached { total_minutes: u32 },
}

pub struct LimitEvaluator {
    cooldown: Duration,
    state: NotificationCooldownState,
}

impl LimitEvaluator {
    pub fn new(cooldown_minutes: u32, state: NotificationCooldownState) -> Self {
        Self { cooldown: Duration::minutes(cooldown_minutes as i64), state }
    }

    /// Evaluate total usage against the limit. Returns the event that is
    /// eligible to fire, recording its timestamp, or `None`.
    ///
    /// The two conditions are mutually exclusive by construction: reaching
    /// the limit puts the remaining minutes at or below zero, outside the
    /// approaching range.
    pub fn evaluate(
        &mut self,
        total_minutes: f64,
        config: &LimitConfig,
        now: DateTime<Local>,
    ) -> Option<LimitEvent> {
        if !config.notifications_enabled {
            return None;
        }

        let config = config.clamped();
        let limit = config.screen_time_limit_minutes as f64;
        let frequency = config.notification_frequency_minutes as f64;
        let remaining = limit - total_minutes;

        if total_minutes >= limit {
            if !self.cooldown_elapsed(self.state.last_limit_reached_fired_at, now) {
                debug!("Limit reached but still in cooldown");
                return None;
            }
            self.state.last_limit_reached_fired_at = Some(now);
            return Some(LimitEvent::LimitReached { total_minutes: total_minutes.round() as u32 });
        }

        if remaining > 0.0 && remaining <= frequency {
            if !self.cooldown_elapsed(self.state.last_approaching_fired_at, now) {
                debug!("Approaching limit but still in cooldown");
                return None;
            }
            self.state.last_approaching_fired_at = Some(now);
            return Some(LimitEvent::ApproachingLimit {
                minutes_remaining: remaining.ceil() as u32,
            });
        }

        None
    }

    fn cooldown_elapsed(&self, fired_at: Option<DateTime<Local>>, now: DateTime<Local>) -> bool {
        match fired_at {
            Some(at) => now.signed_duration_since(at) >= self.cooldown,
            None => true,
        }
    }

    /// Current cooldown timestamps, persisted by the caller after each
    /// evaluation so cooldowns survive restarts.
    pub fn cooldown_state(&self) -> NotificationCooldownState {
        self.state
    }
}
