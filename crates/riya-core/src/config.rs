//! Configuration model.
//!
//! Every field has a default, so an empty or missing `config.toml` yields a
//! working setup apart from the completion endpoint URL.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::greeting::IST_OFFSET_SECS;
use crate::typing::TypingDelayConfig;

/// Canonical guest allowance.
///
/// Earlier front-ends used both 25 and 30 in different places; 25 is the
/// single configured default here and can be overridden in `[chat]`.
pub const DEFAULT_GUEST_MESSAGE_LIMIT: u32 = 25;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiyaConfig {
    pub chat: ChatConfig,
    pub completion: CompletionConfig,
    pub storage: StorageConfig,
    pub persona: PersonaConfig,
}

/// Behaviour of the guest chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub guest_message_limit: u32,
    /// Quiet period after the last send before the batch is flushed.
    pub debounce_ms: u64,
    /// Pause between two revealed replies.
    pub inter_message_gap_ms: u64,
    /// Upper bound on one completion call.
    pub completion_timeout_secs: u64,
    /// Offset (seconds east of UTC) the greeting clock is normalized to.
    pub greeting_utc_offset_secs: i32,
    /// Persist assistant replies locally. Off when the completion endpoint
    /// stores its own replies.
    pub persist_replies: bool,
    pub typing: TypingDelayConfig,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            guest_message_limit: DEFAULT_GUEST_MESSAGE_LIMIT,
            debounce_ms: 5000,
            inter_message_gap_ms: 250,
            completion_timeout_secs: 30,
            greeting_utc_offset_secs: IST_OFFSET_SECS,
            persist_replies: false,
            typing: TypingDelayConfig::default(),
        }
    }
}

impl ChatConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn inter_message_gap(&self) -> Duration {
        Duration::from_millis(self.inter_message_gap_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

/// Where the hosted completion function lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub url: Option<String>,
    /// Bearer token, usually supplied via `RIYA_API_KEY` instead of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the platform data directory.
    pub data_dir: Option<String>,
    /// Keep conversations in memory only.
    pub ephemeral: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Custom minijinja template for the system prompt.
    pub template: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: RiyaConfig = toml::from_str("").unwrap();
        assert_eq!(config, RiyaConfig::default());
        assert_eq!(config.chat.guest_message_limit, 25);
        assert_eq!(config.chat.debounce(), Duration::from_secs(5));
        assert_eq!(config.chat.greeting_utc_offset_secs, 19_800);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: RiyaConfig = toml::from_str(
            r#"
            [chat]
            guest_message_limit = 30
            debounce_ms = 1500

            [chat.typing]
            jitter = 0.0

            [completion]
            url = "https://example.invalid/chat"
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.guest_message_limit, 30);
        assert_eq!(config.chat.debounce_ms, 1500);
        assert_eq!(config.chat.inter_message_gap_ms, 250);
        assert_eq!(config.chat.typing.jitter, 0.0);
        assert_eq!(config.chat.typing.max_ms, 6000);
        assert_eq!(
            config.completion.url.as_deref(),
            Some("https://example.invalid/chat")
        );
        assert!(!config.storage.ephemeral);
    }
}
