use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir =
            dirs::data_dir().unwrap_or_else(|| PathBuf::from("/tmp")).join("screenbalance");

        Self { data_dir: data_dir.to_string_lossy().to_string() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Background poll interval while the app is backgrounded
    pub background_poll_secs: u64,
    /// In-app live-tracking tick while foregrounded
    pub foreground_tick_secs: u64,
    /// How often the day-rollover check runs; must be one minute or less
    /// so a midnight crossing is never missed
    pub rollover_check_secs: u64,
    /// Downstream update callbacks are coalesced into this window
    pub debounce_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            background_poll_secs: 30,
            foreground_tick_secs: 5,
            rollover_check_secs: 60,
            debounce_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct NotificationsConfig {
    /// Minimum gap before the same notification kind may fire again
    pub cooldown_minutes: u32,
    pub enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self { cooldown_minutes: 5, enabled: true }
    }
}

impl EngineConfig {
    /// Default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("screenbalance")
            .join("engine.toml")
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        debug!("Loading engine configuration from {:?}", config_path);

        if !config_path.exists() {
            info!(
                "Configuration file not found at {:?}, creating default configuration",
                config_path
            );
            let default_config = Self::default();
            default_config.save_to_path(config_path)?;
            return Ok(default_config);
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: EngineConfig = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        info!("Loaded engine configuration from {:?}", config_path);
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        debug!("Saving engine configuration to {:?}", config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let config_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(config_path, config_content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        info!("Saved engine configuration to {:?}", config_path);
        Ok(())
    }

    /// Validate the configuration settings
    pub fn validate(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.storage.data_dir).parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create data directory: {:?}", parent))?;
        }

        if self.tracking.rollover_check_secs > 60 {
            warn!(
                "rollover_check_secs is {}s; a day boundary can be missed for that long",
                self.tracking.rollover_check_secs
            );
        }

        if self.tracking.background_poll_secs == 0 {
            anyhow::bail!("background_poll_secs must be non-zero");
        }

        if self.tracking.foreground_tick_secs == 0 {
            anyhow::bail!("foreground_tick_secs must be non-zero");
        }

        debug!("Configuration validation passed");
        Ok(())
    }
}
