//! Storage and configuration adapters for riya.

pub mod config_service;
pub mod jsonl_conversation_store;
pub mod memory_store;
pub mod paths;
pub mod storage;
pub mod stores;
pub mod toml_guest_record_store;
pub mod toml_persona_store;

pub use crate::config_service::ConfigService;
pub use crate::jsonl_conversation_store::JsonlConversationStore;
pub use crate::memory_store::{InMemoryConversationStore, InMemoryGuestRecordStore};
pub use crate::paths::RiyaPaths;
pub use crate::stores::Stores;
pub use crate::toml_guest_record_store::TomlGuestRecordStore;
pub use crate::toml_persona_store::TomlPersonaStore;
