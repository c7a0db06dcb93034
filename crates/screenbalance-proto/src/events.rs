use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Events pushed from the native plugin boundary.
///
/// The native side emits these onto a channel; the engine consumes them
/// synchronously, keeping transport separate from business logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// App moved between foreground and background
    AppStateChanged { is_active: bool, timestamp: DateTime<Local> },
    /// Push event carrying a JSON usage snapshot for the current day
    UsageUpdated { payload: serde_json::Value, timestamp: DateTime<Local> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = BridgeEvent::AppStateChanged { is_active: false, timestamp: Local::now() };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("app_state_changed"));

        let deserialized: BridgeEvent = serde_json::from_str(&json).unwrap();
        match deserialized {
            BridgeEvent::AppStateChanged { is_active, .. } => assert!(!is_active),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_usage_updated_carries_payload() {
        let event = BridgeEvent::UsageUpdated {
            payload: serde_json::json!({ "apps": [{ "name": "Chrome", "minutes": 12.5 }] }),
            timestamp: Local::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("usage_updated"));

        let deserialized: BridgeEvent = serde_json::from_str(&json).unwrap();
        match deserialized {
            BridgeEvent::UsageUpdated { payload, .. } => {
                assert_eq!(payload["apps"][0]["name"], "Chrome");
            }
            _ => panic!("Wrong event type"),
        }
    }
}
