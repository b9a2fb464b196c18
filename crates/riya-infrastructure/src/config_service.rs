//! Configuration loading.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. `config.toml` in the config directory
//! 3. environment (`RIYA_COMPLETION_URL`, `RIYA_API_KEY`, `RIYA_GUEST_LIMIT`)
//!
//! Command-line flags are applied on top by the binary.

use std::path::PathBuf;

use riya_core::config::RiyaConfig;
use riya_core::{Result, RiyaError};

use crate::paths::RiyaPaths;
use crate::storage::AtomicTomlFile;

pub const ENV_COMPLETION_URL: &str = "RIYA_COMPLETION_URL";
pub const ENV_API_KEY: &str = "RIYA_API_KEY";
pub const ENV_GUEST_LIMIT: &str = "RIYA_GUEST_LIMIT";

pub struct ConfigService {
    config_file: PathBuf,
}

impl ConfigService {
    /// Uses `config.toml` under the resolved config directory.
    pub fn new(paths: &RiyaPaths) -> Result<Self> {
        Ok(Self {
            config_file: paths.config_file()?,
        })
    }

    /// Uses an explicit config file (the `--config` flag).
    pub fn with_path(config_file: PathBuf) -> Self {
        Self { config_file }
    }

    pub fn config_file(&self) -> &std::path::Path {
        &self.config_file
    }

    /// Loads the file (defaults if absent) and applies process environment overrides.
    pub fn load(&self) -> Result<RiyaConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an injectable environment lookup.
    pub fn load_with_env<F>(&self, env: F) -> Result<RiyaConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = AtomicTomlFile::<RiyaConfig>::new(self.config_file.clone());
        let mut config = match file.load()? {
            Some(config) => {
                tracing::debug!("[Config] Loaded {}", self.config_file.display());
                config
            }
            None => {
                tracing::debug!(
                    "[Config] {} not found, using defaults",
                    self.config_file.display()
                );
                RiyaConfig::default()
            }
        };
        apply_env_overrides(&mut config, env)?;
        Ok(config)
    }

    /// Writes a default config file if none exists yet and returns its path.
    pub fn ensure_config_file(&self) -> Result<PathBuf> {
        if self.config_file.exists() {
            return Ok(self.config_file.clone());
        }
        AtomicTomlFile::<RiyaConfig>::new(self.config_file.clone()).save(&RiyaConfig::default())?;
        tracing::info!("[Config] Wrote default config to {}", self.config_file.display());
        Ok(self.config_file.clone())
    }
}

fn apply_env_overrides<F>(config: &mut RiyaConfig, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env(ENV_COMPLETION_URL).filter(|v| !v.trim().is_empty()) {
        config.completion.url = Some(url);
    }
    if let Some(key) = env(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.completion.api_key = Some(key);
    }
    if let Some(limit) = env(ENV_GUEST_LIMIT) {
        config.chat.guest_message_limit = limit.trim().parse().map_err(|_| {
            RiyaError::config(format!("{ENV_GUEST_LIMIT} must be a positive integer, got '{limit}'"))
        })?;
    }
    Ok(())
}
