//! Resolved configuration for one CLI run.

use std::path::PathBuf;

use anyhow::Result;
use riya_core::RiyaError;
use riya_core::config::RiyaConfig;
use riya_infrastructure::storage::AtomicTomlFile;
use riya_infrastructure::{ConfigService, RiyaPaths};
use serde::{Deserialize, Serialize};

use crate::GlobalArgs;

/// Config file + environment + flags, and the directories derived from them.
pub struct Settings {
    pub paths: RiyaPaths,
    pub config: RiyaConfig,
}

/// What the CLI remembers between runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CliState {
    last_session_id: Option<String>,
}

impl Settings {
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let service = match &args.config {
            Some(path) => ConfigService::with_path(path.clone()),
            None => ConfigService::new(&RiyaPaths::default())?,
        };
        let mut config = service.load()?;
        apply_flags(&mut config, args);

        let paths = RiyaPaths::new(config.storage.data_dir.as_ref().map(PathBuf::from));
        Ok(Self { paths, config })
    }

    /// Session id of the previous `riya chat`, if any.
    pub fn last_session(&self) -> Result<Option<String>> {
        let state = self.state_file()?.load().map_err(RiyaError::from)?;
        Ok(state.and_then(|s| s.last_session_id))
    }

    pub fn remember_session(&self, session_id: &str) -> Result<()> {
        let state = CliState {
            last_session_id: Some(session_id.to_string()),
        };
        self.state_file()?.save(&state).map_err(RiyaError::from)?;
        Ok(())
    }

    fn state_file(&self) -> Result<AtomicTomlFile<CliState>> {
        Ok(AtomicTomlFile::new(self.paths.state_file()?))
    }
}

fn apply_flags(config: &mut RiyaConfig, args: &GlobalArgs) {
    if let Some(endpoint) = &args.endpoint {
        config.completion.url = Some(endpoint.clone());
    }
    if let Some(limit) = args.limit {
        config.chat.guest_message_limit = limit;
    }
    if args.ephemeral {
        config.storage.ephemeral = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config() {
        let mut config = RiyaConfig::default();
        let args = GlobalArgs {
            endpoint: Some("http://localhost:8787/chat".into()),
            limit: Some(3),
            ephemeral: true,
            ..GlobalArgs::default()
        };
        apply_flags(&mut config, &args);

        assert_eq!(config.completion.url.as_deref(), Some("http://localhost:8787/chat"));
        assert_eq!(config.chat.guest_message_limit, 3);
        assert!(config.storage.ephemeral);
    }

    #[test]
    fn test_remembers_last_session() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            paths: RiyaPaths::new(Some(temp_dir.path().to_path_buf())),
            config: RiyaConfig::default(),
        };
        assert_eq!(settings.last_session().unwrap(), None);

        settings.remember_session("guest-42").unwrap();
        assert_eq!(settings.last_session().unwrap().as_deref(), Some("guest-42"));
    }
}
