use notify_rust::{Notification as SystemNotification, Urgency};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPriority {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone)]
pub struct UsageNotification {
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
}

/// Hands notifications to the platform notification channel through a
/// queue task. Delivery is at-most-once: a failed hand-off is logged and
/// never retried, and callers are never blocked on it.
pub struct NotificationManager {
    sender: mpsc::UnboundedSender<UsageNotification>,
}

impl NotificationManager {
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<UsageNotification>();

        tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                if let Err(e) = Self::show(&notification) {
                    warn!("Failed to send notification '{}': {}", notification.title, e);
                }
            }
        });

        Self { sender }
    }

    /// Queue a notification. A queue failure is logged, not surfaced; a
    /// missed notification waits for the next natural evaluation cycle.
    pub fn send(&self, notification: UsageNotification) {
        if self.sender.send(notification).is_err() {
            warn!("Notification queue is closed, dropping notification");
        }
    }

    fn show(notification: &UsageNotification) -> notify_rust::error::Result<()> {
        let urgency = match notification.priority {
            NotificationPriority::Low => Urgency::Low,
            NotificationPriority::Normal => Urgency::Normal,
            NotificationPriority::High => Urgency::Critical,
        };

        SystemNotification::new()
            .summary(&notification.title)
            .body(&notification.message)
            .urgency(urgency)
            .timeout(Self::timeout_for(notification.priority))
            .show()?;

        info!("Notification sent: {}", notification.title);
        Ok(())
    }

    fn timeout_for(priority: NotificationPriority) -> notify_rust::Timeout {
        match priority {
            NotificationPriority::Low => notify_rust::Timeout::Milliseconds(5000),
            NotificationPriority::Normal => notify_rust::Timeout::Milliseconds(8000),
            NotificationPriority::High => notify_rust::Timeout::Milliseconds(15000),
        }
    }

    pub fn approaching_limit(minutes_remaining: u32) -> UsageNotification {
        UsageNotification {
            title: "Screen Time Warning".to_string(),
            message: format!("{} minutes of screen time remaining today", minutes_remaining),
            priority: NotificationPriority::Normal,
        }
    }

    pub fn limit_reached(total_minutes: u32, limit_minutes: u32) -> UsageNotification {
        UsageNotification {
            title: "Screen Time Limit Reached".to_string(),
            message: format!(
                "You have used {} minutes today, past your {} minute limit",
                total_minutes, limit_minutes
            ),
            priority: NotificationPriority::High,
        }
    }

    pub fn report_sent(email: &str) -> UsageNotification {
        UsageNotification {
            title: "Usage Report Ready".to_string(),
            message: format!("Your usage report for {} has been handed to the mail client", email),
            priority: NotificationPriority::Low,
        }
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}
