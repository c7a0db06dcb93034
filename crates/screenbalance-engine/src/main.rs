use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use screenbalance_engine::config::EngineConfig;
use screenbalance_engine::Engine;
use screenbalance_proto::{MailComposer, MockBridge, RawAppEntry, UsageBridge};
use tracing::{error, info};

/// Dev harness entry point: runs the engine against the in-memory mock
/// bridge. The real native bridge is provided by the host application.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting screenbalance engine (dev harness)");

    if let Err(e) = run().await {
        error!("Engine error: {}", e);
        return Err(e);
    }

    info!("screenbalance engine stopped");
    Ok(())
}

async fn run() -> Result<()> {
    let config = EngineConfig::load()?;

    let bridge: Arc<dyn UsageBridge> = Arc::new(MockBridge::with_entries(sample_entries()));
    let composer: Arc<dyn MailComposer> = Arc::new(LoggingComposer);

    let engine = Engine::new(config, bridge, composer)?;
    engine.start().await?;

    let status = engine.tracker_status().await;
    info!(
        "Tracking started: total {} min across {} apps, poll interval {} ms",
        engine.total_screen_time().await.round(),
        engine.app_usage_data().await.len(),
        status.update_interval_ms
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");
    engine.shutdown().await;
    Ok(())
}

fn sample_entries() -> Vec<RawAppEntry> {
    let now = Local::now().timestamp_millis();
    [("Chrome", 30.0), ("YouTube", 45.0), ("Duolingo", 20.0)]
        .into_iter()
        .map(|(name, minutes)| RawAppEntry {
            name: name.to_string(),
            minutes,
            category: None,
            last_used: Some(now),
            icon: None,
        })
        .collect()
}

/// Logs composed reports instead of opening a mail client.
struct LoggingComposer;

#[async_trait::async_trait]
impl MailComposer for LoggingComposer {
    async fn compose(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), screenbalance_proto::BridgeError> {
        info!("Composed mail to {}: {}\n{}", to, subject, body);
        Ok(())
    }
}
