//! Events the chat orchestrator publishes to its front-end.

use riya_core::gate::{GateState, LoginPrompt};
use riya_core::message::{ChatMessage, MessageId};
use serde::Serialize;

/// One observable change in the chat UI.
///
/// Events arrive on an unbounded channel in the order the orchestrator
/// produced them, so a front-end can render by simply replaying them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// The session was opened; `messages` is the transcript to show first.
    SessionOpened {
        messages: Vec<ChatMessage>,
        quick_replies: Vec<String>,
        gate: GateState,
    },
    /// A user message was queued and is shown optimistically.
    UserMessage { id: MessageId, message: ChatMessage },
    TypingStarted,
    TypingStopped,
    /// A companion reply was revealed.
    BotMessage { id: MessageId, message: ChatMessage },
    /// A failed flush removed these optimistic user messages.
    BatchRolledBack { ids: Vec<MessageId> },
    /// Something went wrong; the user may simply try again.
    TransientFailure { message: String },
    /// The backend accepted a batch and the counter moved.
    GateUpdated {
        state: GateState,
        remaining: Option<u32>,
    },
    PromptRaised(LoginPrompt),
    PromptDismissed,
    /// The guest signed in; limits no longer apply.
    Converted { user_id: String },
}
