//! Store selection from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use riya_core::Result;
use riya_core::config::StorageConfig;
use riya_core::repository::{ConversationStore, GuestRecordStore};

use crate::jsonl_conversation_store::JsonlConversationStore;
use crate::memory_store::{InMemoryConversationStore, InMemoryGuestRecordStore};
use crate::paths::RiyaPaths;
use crate::toml_guest_record_store::TomlGuestRecordStore;

/// The pair of stores one chat session needs.
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn ConversationStore>,
    pub guest_records: Arc<dyn GuestRecordStore>,
}

impl Stores {
    /// Both stores in memory; nothing survives the process.
    pub fn in_memory() -> Self {
        Self {
            conversations: Arc::new(InMemoryConversationStore::new()),
            guest_records: Arc::new(InMemoryGuestRecordStore::new()),
        }
    }

    /// File-backed stores under the data directory.
    pub fn on_disk(paths: &RiyaPaths) -> Result<Self> {
        Ok(Self {
            conversations: Arc::new(JsonlConversationStore::new(paths.conversations_dir()?)?),
            guest_records: Arc::new(TomlGuestRecordStore::new(paths.sessions_dir()?)?),
        })
    }

    /// Picks in-memory or on-disk stores according to `[storage]`.
    pub fn from_config(storage: &StorageConfig) -> Result<Self> {
        if storage.ephemeral {
            tracing::info!("[Store] Using in-memory stores");
            return Ok(Self::in_memory());
        }
        let paths = RiyaPaths::new(storage.data_dir.as_ref().map(PathBuf::from));
        let stores = Self::on_disk(&paths)?;
        tracing::info!("[Store] Using data directory {}", paths.data_dir()?.display());
        Ok(stores)
    }
}
