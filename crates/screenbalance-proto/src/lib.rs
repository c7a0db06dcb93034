pub mod bridge;
pub mod events;

pub use bridge::{
    BridgeError, MailComposer, MockBridge, MockComposer, RawAppEntry, SharedPreferencesSnapshot,
    UsageBridge,
};
pub use events::BridgeEvent;
