//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub const ENV_SERVER_URL: &str = "SKETCHSYNC_SERVER_URL";
pub const ENV_MAX_ATTEMPTS: &str = "SKETCHSYNC_MAX_ATTEMPTS";

/// Settings for the sync manager and history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Relay base URL, `ws://` or `wss://`.
    pub server_url: String,
    /// First reconnect delay; doubles per attempt.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Minimum spacing between cursor broadcasts.
    pub cursor_interval_ms: u64,
    pub autosave_interval_secs: u64,
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:3000".to_string(),
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            max_attempts: 8,
            cursor_interval_ms: 33,
            autosave_interval_secs: 30,
            history_limit: 100,
        }
    }
}

impl SyncConfig {
    /// `<config dir>/sketchsync/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sketchsync").join("config.json"))
    }

    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default path, then apply environment overrides.
    pub fn load_default() -> CoreResult<Self> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply `SKETCHSYNC_SERVER_URL` and `SKETCHSYNC_MAX_ATTEMPTS`.
    pub fn apply_env(&mut self) -> CoreResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CoreResult<()> {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = raw
                .trim()
                .parse()
                .map_err(|e| CoreError::Config(format!("{ENV_MAX_ATTEMPTS}={raw}: {e}")))?;
        }
        self.validate()
    }

    fn validate(&self) -> CoreResult<()> {
        if self.base_delay_ms == 0 {
            return Err(CoreError::Config("base_delay_ms must be positive".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(CoreError::Config("max_delay_ms must be at least base_delay_ms".into()));
        }
        if self.history_limit == 0 {
            return Err(CoreError::Config("history_limit must be positive".into()));
        }
        Ok(())
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn cursor_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_interval_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}
