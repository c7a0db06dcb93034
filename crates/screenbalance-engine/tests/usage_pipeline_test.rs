use std::sync::Arc;

use chrono::Local;
use screenbalance_common::{LimitConfig, NotificationCooldownState};
use screenbalance_engine::config::EngineConfig;
use screenbalance_engine::report::render_report;
use screenbalance_engine::storage::{StateStore, COOLDOWNS_KEY};
use screenbalance_engine::Engine;
use screenbalance_proto::{BridgeEvent, MailComposer, MockBridge, MockComposer, RawAppEntry};
use tempfile::tempdir;

fn entry(name: &str, minutes: f64) -> RawAppEntry {
    RawAppEntry {
        name: name.to_string(),
        minutes,
        category: None,
        last_used: Some(Local::now().timestamp_millis()),
        icon: None,
    }
}

fn setup(bridge: Arc<MockBridge>) -> (Engine, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.storage.data_dir = dir.path().join("state").to_string_lossy().to_string();
    config.tracking.debounce_ms = 0;

    let composer: Arc<dyn MailComposer> = Arc::new(MockComposer::new());
    let engine = Engine::new(config, bridge, composer).unwrap();
    (engine, dir)
}

#[tokio::test]
async fn test_snapshot_to_total_to_limit_evaluation() {
    let bridge =
        Arc::new(MockBridge::with_entries(vec![entry("Chrome", 30.0), entry("YouTube", 45.0)]));
    let (engine, dir) = setup(Arc::clone(&bridge));

    // Limit of 60 with 75 minutes used: the reached notification fires and
    // its cooldown timestamp is persisted
    engine
        .set_limit_config(LimitConfig {
            screen_time_limit_minutes: 60,
            notification_frequency_minutes: 15,
            notifications_enabled: true,
        })
        .await;

    assert!(engine.update_usage_data().await);
    assert_eq!(engine.total_screen_time().await, 75.0);

    let store = StateStore::new(dir.path().join("state")).unwrap();
    let cooldowns: NotificationCooldownState = store.load_json(COOLDOWNS_KEY).unwrap();
    assert!(cooldowns.last_limit_reached_fired_at.is_some());
    assert!(cooldowns.last_approaching_fired_at.is_none());
}

#[tokio::test]
async fn test_report_for_mixed_day_scores_ten() {
    let bridge =
        Arc::new(MockBridge::with_entries(vec![entry("Chrome", 30.0), entry("YouTube", 45.0)]));
    let (engine, _dir) = setup(bridge);

    assert!(engine.update_usage_data().await);

    let records = engine.app_usage_data().await;
    let (_, body) = render_report(&records, Local::now().date_naive());

    // Chrome classifies as productivity, YouTube as entertainment:
    // (1.0 * 30 - 0.5 * 45) / 75 * 100 = 10
    assert!(body.contains("Total screen time: 75 minutes"));
    assert!(body.contains("Productivity score: +10%"));
}

#[tokio::test]
async fn test_bridge_events_flow_through_event_loop() {
    let bridge = Arc::new(MockBridge::new());
    let (engine, _dir) = setup(bridge);
    let engine = Arc::new(engine);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let loop_engine = Arc::clone(&engine);
    let event_loop = tokio::spawn(async move { loop_engine.run_event_loop(rx).await });

    tx.send(BridgeEvent::UsageUpdated {
        payload: serde_json::json!([
            { "name": "Signal", "minutes": 12.0, "last_used": Local::now().timestamp_millis() },
            { "minutes": 99.0 },
        ]),
        timestamp: Local::now(),
    })
    .unwrap();
    tx.send(BridgeEvent::AppStateChanged { is_active: false, timestamp: Local::now() })
        .unwrap();

    drop(tx);
    event_loop.await.unwrap();

    assert_eq!(engine.total_screen_time().await, 12.0);
    assert!(engine.tracker_status().await.is_tracking);

    engine.shutdown().await;
    assert!(!engine.tracker_status().await.is_tracking);
}

#[tokio::test]
async fn test_aggregate_survives_engine_restart() {
    let dir = tempdir().unwrap();
    let data_dir = dir.path().join("state").to_string_lossy().to_string();

    let bridge = Arc::new(MockBridge::with_entries(vec![entry("Chrome", 30.0)]));
    {
        let mut config = EngineConfig::default();
        config.storage.data_dir = data_dir.clone();
        let composer: Arc<dyn MailComposer> = Arc::new(MockComposer::new());
        let engine = Engine::new(config, bridge.clone(), composer).unwrap();
        assert!(engine.update_usage_data().await);
        engine.shutdown().await;
    }

    // Second process start with an unreachable native layer still serves
    // the persisted aggregate
    bridge.fail_calls.store(true, std::sync::atomic::Ordering::SeqCst);
    let mut config = EngineConfig::default();
    config.storage.data_dir = data_dir;
    let composer: Arc<dyn MailComposer> = Arc::new(MockComposer::new());
    let engine = Engine::new(config, bridge, composer).unwrap();

    assert!(!engine.update_usage_data().await);
    assert_eq!(engine.total_screen_time().await, 30.0);
}
