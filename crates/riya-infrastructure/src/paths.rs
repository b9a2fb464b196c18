//! Path management for riya configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/riya/              # Config directory
//! ├── config.toml              # Application configuration
//! └── persona.toml             # Onboarding answers
//!
//! ~/.local/share/riya/         # Data directory
//! ├── sessions/                # Guest records, one TOML file per session
//! ├── conversations/           # Conversation rows, one JSONL file per session
//! ├── state.toml               # Last opened session
//! └── logs/                    # Application logs
//!     └── riya.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for riya_core::RiyaError {
    fn from(err: PathError) -> Self {
        riya_core::RiyaError::config(err.to_string())
    }
}

const APP_NAME: &str = "riya";

/// Resolves riya's directories.
///
/// With a base override (tests, `storage.data_dir`), config and data both
/// live under that one directory.
#[derive(Debug, Clone, Default)]
pub struct RiyaPaths {
    base_override: Option<PathBuf>,
}

impl RiyaPaths {
    /// Creates a resolver. `None` uses the platform directories.
    pub fn new(base_override: Option<PathBuf>) -> Self {
        Self { base_override }
    }

    /// Returns the riya configuration directory (e.g. `~/.config/riya/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the riya data directory (e.g. `~/.local/share/riya/`).
    pub fn data_dir(&self) -> Result<PathBuf, PathError> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the saved onboarding answers.
    pub fn persona_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("persona.toml"))
    }

    /// Small state file remembering the last opened session.
    pub fn state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("state.toml"))
    }

    /// Directory holding one guest record per session.
    pub fn sessions_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("sessions"))
    }

    /// Directory holding one conversation log per session.
    pub fn conversations_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("conversations"))
    }

    pub fn logs_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.data_dir()?.join("logs"))
    }
}

/// Turns a session id into a safe file stem.
///
/// Session ids come from clients; anything outside `[A-Za-z0-9_-]` is
/// replaced so an id can never escape its directory.
pub fn session_file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
