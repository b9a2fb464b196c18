//! Application layer for Riya.
//!
//! This crate wires the domain pieces from `riya-core` into use cases: the
//! guest chat orchestrator, session opening/restore and persona prompt
//! rendering.

pub mod event;
pub mod factory;
pub mod guest_chat_service;
pub mod persona_prompt_service;
pub mod transcript;

pub use event::ChatEvent;
pub use factory::ChatServiceFactory;
pub use guest_chat_service::{ChatDependencies, FlushReport, GuestChatService, SessionSnapshot};
pub use persona_prompt_service::PersonaPromptService;
pub use transcript::{Transcript, TranscriptEntry};
