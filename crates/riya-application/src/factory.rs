use std::sync::Arc;

use chrono::FixedOffset;
use riya_core::Result;
use riya_core::config::ChatConfig;
use riya_core::gate::GuestGate;
use riya_core::greeting::{GreetingContext, ist, select_greeting_at};
use riya_core::message::ChatMessage;
use riya_core::session::SessionContext;
use tokio::sync::mpsc;

use crate::event::ChatEvent;
use crate::guest_chat_service::{ChatDependencies, GuestChatService, SessionSnapshot};
use crate::transcript::Transcript;

/// Factory for opening chat sessions from stored state.
///
/// This factory handles the conversion between the stored guest record and
/// conversation rows (persistent data) and `GuestChatService` (runtime state).
pub struct ChatServiceFactory {
    config: ChatConfig,
    deps: ChatDependencies,
    system_prompt: Option<String>,
}

impl ChatServiceFactory {
    /// Creates a new ChatServiceFactory.
    ///
    /// # Arguments
    ///
    /// * `config` - Chat pipeline settings handed to every session
    /// * `deps` - Completion client, stores and scheduler shared by all sessions
    pub fn new(config: ChatConfig, deps: ChatDependencies) -> Self {
        Self {
            config,
            deps,
            system_prompt: None,
        }
    }

    /// Sets the persona system prompt sent with every completion request.
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Opens a session, restoring it if the stores know it.
    ///
    /// # Arguments
    ///
    /// * `context` - Session identity supplied by the caller
    ///
    /// # Returns
    ///
    /// The running service and the receiver for its events. The first event
    /// is always `ChatEvent::SessionOpened`.
    ///
    /// # Errors
    ///
    /// Returns an error if either store cannot be read.
    pub async fn open(
        &self,
        context: SessionContext,
    ) -> Result<(Arc<GuestChatService>, mpsc::UnboundedReceiver<ChatEvent>)> {
        let snapshot = self.load_snapshot(context).await?;
        tracing::info!(
            "[GuestChat] Opened {} ({} message(s) on screen, gate {:?})",
            snapshot.context.session_id,
            snapshot.transcript.len(),
            snapshot.gate.state()
        );
        Ok(GuestChatService::new(
            self.config.clone(),
            self.deps.clone(),
            snapshot,
            self.system_prompt.clone(),
        ))
    }

    /// Builds the starting state for `context`.
    ///
    /// A session with history gets its transcript back and no greeting. A
    /// fresh one shows the time-of-day greeting as a pending, unstored message.
    pub async fn load_snapshot(&self, mut context: SessionContext) -> Result<SessionSnapshot> {
        let limit = self.config.guest_message_limit;
        let record = self.deps.guest_records.find(&context.session_id).await?;
        let history = self.deps.conversations.list(&context.session_id).await?;

        let gate = match &record {
            _ if !context.is_guest() => {
                let count = record.as_ref().map_or(0, |r| r.message_count);
                GuestGate::restore(limit, count, true)
            }
            Some(record) => {
                if let Some(user_id) = record.user_id.as_ref().filter(|_| record.converted) {
                    context = SessionContext::user(&context.session_id, user_id);
                }
                GuestGate::restore(limit, record.message_count, record.converted)
            }
            None => GuestGate::new(limit),
        };

        let mut transcript = Transcript::from_history(&history);
        let (pending_greeting, quick_replies) = if history.is_empty() {
            let offset =
                FixedOffset::east_opt(self.config.greeting_utc_offset_secs).unwrap_or_else(ist);
            let returning = record.as_ref().is_some_and(|r| r.message_count > 0);
            let greeting = select_greeting_at(
                self.deps.scheduler.now(),
                offset,
                GreetingContext { returning },
            );
            transcript.push(ChatMessage::assistant(greeting.text.clone()));
            (Some(greeting.text), greeting.quick_replies)
        } else {
            (None, Vec::new())
        };

        Ok(SessionSnapshot {
            context,
            transcript,
            gate,
            pending_greeting,
            quick_replies,
        })
    }
}
