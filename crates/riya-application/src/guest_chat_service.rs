//! GuestChatService - runs the chat pipeline for one session.
//!
//! Sends are shown immediately, queued, and flushed to the completion
//! endpoint as one batch once the quiet period passes. A flush is
//! single-flight: replies are revealed one by one with a typing delay, and the
//! guest gate is updated only after the backend accepted the batch. Any
//! failure removes the batch from the transcript and leaves the count alone.

use std::sync::Arc;

use riya_core::batch::{Batch, BatchQueue, FlushSkip};
use riya_core::completion::{CompletionClient, CompletionRequest};
use riya_core::config::ChatConfig;
use riya_core::gate::{FlushOutcome, GateState, GuestGate, LoginPrompt, SendDecision};
use riya_core::message::{ChatMessage, MessageId, MessageRole, StoredTurn};
use riya_core::repository::{ConversationStore, GuestRecordStore};
use riya_core::scheduler::Scheduler;
use riya_core::session::{GuestRecord, SessionContext};
use riya_core::{Result, RiyaError};
use tokio::sync::{Mutex, mpsc};

use crate::event::ChatEvent;
use crate::transcript::Transcript;

/// Collaborators a chat session talks to.
#[derive(Clone)]
pub struct ChatDependencies {
    pub completion: Arc<dyn CompletionClient>,
    pub conversations: Arc<dyn ConversationStore>,
    pub guest_records: Arc<dyn GuestRecordStore>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Everything a session starts from, fresh or restored.
#[derive(Debug)]
pub struct SessionSnapshot {
    pub context: SessionContext,
    pub transcript: Transcript,
    pub gate: GuestGate,
    /// Greeting on screen but not yet stored; written with the first successful flush.
    pub pending_greeting: Option<String>,
    pub quick_replies: Vec<String>,
}

/// Result of one flush attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushReport {
    Skipped(FlushSkip),
    /// The gate was already blocked, so the queued messages were dropped
    /// without contacting the backend.
    Suppressed { dropped: usize },
    Delivered {
        accepted: usize,
        replies: usize,
        gate: GateState,
    },
}

struct ChatState {
    context: SessionContext,
    transcript: Transcript,
    queue: BatchQueue,
    gate: GuestGate,
    pending_greeting: Option<String>,
    quick_replies: Vec<String>,
    prompt: Option<LoginPrompt>,
    /// Accepted messages whose count write failed; added to the next write.
    unsaved_count: u32,
}

/// Chat orchestrator for a single session.
///
/// Always used behind an `Arc`: quiet-period timers run as spawned tasks
/// holding a clone.
pub struct GuestChatService {
    config: ChatConfig,
    deps: ChatDependencies,
    system_prompt: Option<String>,
    events: mpsc::UnboundedSender<ChatEvent>,
    state: Mutex<ChatState>,
}

impl GuestChatService {
    /// Creates the service and publishes `SessionOpened` on the returned channel.
    ///
    /// A snapshot whose gate is already blocked raises the limit prompt
    /// right away.
    ///
    /// # Arguments
    ///
    /// * `config` - Pipeline timings and the guest limit
    /// * `deps` - Completion client, stores and scheduler
    /// * `snapshot` - Initial session state
    /// * `system_prompt` - Persona prompt forwarded with every request
    pub fn new(
        config: ChatConfig,
        deps: ChatDependencies,
        snapshot: SessionSnapshot,
        system_prompt: Option<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ChatEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let mut state = ChatState {
            context: snapshot.context,
            transcript: snapshot.transcript,
            queue: BatchQueue::new(),
            gate: snapshot.gate,
            pending_greeting: snapshot.pending_greeting,
            quick_replies: snapshot.quick_replies,
            prompt: None,
            unsaved_count: 0,
        };

        let _ = events.send(ChatEvent::SessionOpened {
            messages: state.transcript.messages(),
            quick_replies: state.quick_replies.clone(),
            gate: state.gate.state(),
        });
        if state.gate.is_blocked() {
            let prompt = LoginPrompt::limit_reached(state.gate.count(), state.gate.limit());
            state.prompt = Some(prompt.clone());
            let _ = events.send(ChatEvent::PromptRaised(prompt));
        }

        let service = Arc::new(Self {
            config,
            deps,
            system_prompt,
            events,
            state: Mutex::new(state),
        });
        (service, receiver)
    }

    // ============================================================================
    // Sending
    // ============================================================================

    /// Shows `text` in the transcript and queues it for the next batch.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for blank text
    /// - `LimitReached` when the guest allowance is used up; the blocking
    ///   prompt is raised and nothing is sent to the backend
    pub async fn send(self: &Arc<Self>, text: &str) -> Result<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RiyaError::invalid_input("message is empty"));
        }

        let (id, generation) = {
            let mut state = self.state.lock().await;
            if let SendDecision::Rejected(prompt) = state.gate.check_send() {
                let (count, limit) = (state.gate.count(), state.gate.limit());
                tracing::info!(
                    "[GuestChat] Send rejected for {}: limit reached ({}/{})",
                    state.context.session_id,
                    count,
                    limit
                );
                self.raise_prompt(&mut state, prompt);
                return Err(RiyaError::LimitReached { count, limit });
            }

            let message = ChatMessage::user(text);
            let id = state.transcript.push(message.clone());
            let generation = state.queue.enqueue(id, text);
            state.quick_replies.clear();
            self.emit(ChatEvent::UserMessage { id, message });
            (id, generation)
        };

        tracing::debug!("[GuestChat] Queued {:?} (generation {})", id, generation);
        self.arm_timer(generation);
        Ok(id)
    }

    /// Starts a quiet-period timer for `generation`.
    ///
    /// A later `enqueue` bumps the generation, which turns this timer into a
    /// no-op on expiry.
    fn arm_timer(self: &Arc<Self>, generation: u64) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.deps.scheduler.sleep(service.config.debounce()).await;
            if let Err(err) = service.run_flush(Some(generation)).await {
                tracing::debug!("[GuestChat] Timer flush ended with error: {}", err);
            }
        });
    }

    // ============================================================================
    // Flushing
    // ============================================================================

    /// Sends everything queued so far as one batch.
    ///
    /// Calling this while another flush is in flight returns
    /// `FlushReport::Skipped(FlushSkip::InFlight)` and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns the completion or persistence error after the batch has been
    /// rolled back and `TransientFailure` emitted. The session stays usable.
    pub async fn flush(self: &Arc<Self>) -> Result<FlushReport> {
        self.run_flush(None).await
    }

    /// Flushes, or for a timer tagged with `generation`, skips with
    /// `FlushSkip::Superseded` if a send came in since. The generation check
    /// and the drain happen under the same lock.
    async fn run_flush(self: &Arc<Self>, generation: Option<u64>) -> Result<FlushReport> {
        let (batch, context, is_guest, greeting) = {
            let mut state = self.state.lock().await;
            if generation.is_some_and(|g| !state.queue.is_current(g)) {
                return Ok(FlushReport::Skipped(FlushSkip::Superseded));
            }
            if state.gate.is_blocked() {
                return Ok(self.suppress_pending(&mut state));
            }
            let batch = match state.queue.begin_flush() {
                Ok(batch) => batch,
                Err(skip) => return Ok(FlushReport::Skipped(skip)),
            };
            self.emit(ChatEvent::TypingStarted);
            (
                batch,
                state.context.clone(),
                state.gate.is_guest(),
                state.pending_greeting.clone(),
            )
        };

        tracing::info!(
            "[GuestChat] Flushing {} message(s) for {}",
            batch.len(),
            context.session_id
        );

        let replies = match self.deliver(&context, is_guest, greeting, &batch).await {
            Ok(replies) => replies,
            Err(err) => {
                self.roll_back(&batch, &err).await;
                return Err(err);
            }
        };

        self.reveal(&context, &replies).await;

        let accepted = u32::try_from(batch.len()).unwrap_or(u32::MAX);
        let (gate, rearm) = {
            let mut state = self.state.lock().await;
            let outcome = state.gate.record_flush(accepted);
            self.emit(ChatEvent::GateUpdated {
                state: state.gate.state(),
                remaining: state.gate.remaining(),
            });
            if let FlushOutcome::Blocked(prompt) = outcome {
                tracing::info!(
                    "[GuestChat] Guest {} reached the message limit",
                    context.session_id
                );
                self.raise_prompt(&mut state, prompt);
            }
            let rearm = state.queue.finish_flush().then(|| state.queue.generation());
            (state.gate.state(), rearm)
        };

        if is_guest {
            // Already logged and reported; retried with the next write
            let _ = self.store_count(&context.session_id, accepted).await;
        }

        if let Some(generation) = rearm {
            self.arm_timer(generation);
        }

        Ok(FlushReport::Delivered {
            accepted: batch.len(),
            replies: replies.len(),
            gate,
        })
    }

    /// Calls the completion endpoint and, on success, stores the batch.
    async fn deliver(
        &self,
        context: &SessionContext,
        is_guest: bool,
        greeting: Option<String>,
        batch: &Batch,
    ) -> Result<Vec<String>> {
        let request = CompletionRequest::new(context.completion_id(), batch.texts(), is_guest)
            .with_system_prompt(self.system_prompt.clone());
        let timeout = self.config.completion_timeout();

        let replies = tokio::time::timeout(timeout, self.deps.completion.complete(request))
            .await
            .map_err(|_| RiyaError::Timeout {
                seconds: timeout.as_secs(),
            })??;

        self.persist_batch(context, greeting, batch).await?;
        Ok(replies)
    }

    /// Stores the pending greeting (once) and the batch's user rows in one
    /// `append_all`, so a failure leaves none of them behind.
    async fn persist_batch(
        &self,
        context: &SessionContext,
        greeting: Option<String>,
        batch: &Batch,
    ) -> Result<()> {
        let has_greeting = greeting.is_some();
        let turns: Vec<StoredTurn> = greeting
            .map(|text| StoredTurn::new(&context.session_id, MessageRole::Assistant, text))
            .into_iter()
            .chain(batch.messages().iter().map(|message| {
                StoredTurn::new(&context.session_id, MessageRole::User, &message.text)
            }))
            .collect();
        self.deps.conversations.append_all(&turns).await?;
        if has_greeting {
            self.state.lock().await.pending_greeting = None;
        }
        Ok(())
    }

    /// Adds `accepted`, plus whatever earlier writes failed to store, to the
    /// stored guest count.
    ///
    /// On failure the total is kept for the next attempt and
    /// `TransientFailure` is emitted.
    async fn store_count(&self, session_id: &str, accepted: u32) -> Result<()> {
        let owed = {
            let mut state = self.state.lock().await;
            std::mem::take(&mut state.unsaved_count).saturating_add(accepted)
        };
        if owed == 0 {
            return Ok(());
        }

        match self.deps.guest_records.increment(session_id, owed).await {
            Ok(record) => {
                tracing::debug!(
                    "[GuestChat] Stored count for {} is now {}",
                    session_id,
                    record.message_count
                );
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    "[GuestChat] Failed to store message count for {} ({} unsaved): {}",
                    session_id,
                    owed,
                    err
                );
                let mut state = self.state.lock().await;
                state.unsaved_count = state.unsaved_count.saturating_add(owed);
                self.emit(ChatEvent::TransientFailure {
                    message: "Your message count could not be saved yet. It will be retried."
                        .to_string(),
                });
                Err(err)
            }
        }
    }

    /// Retries storing a guest count that an earlier flush failed to save.
    ///
    /// # Errors
    ///
    /// Returns the store error if the write fails again; the count stays
    /// owed.
    pub async fn sync_message_count(&self) -> Result<()> {
        let (session_id, is_guest) = {
            let state = self.state.lock().await;
            (state.context.session_id.clone(), state.gate.is_guest())
        };
        if !is_guest {
            return Ok(());
        }
        self.store_count(&session_id, 0).await
    }

    /// Reveals replies one at a time behind the typing indicator.
    async fn reveal(&self, context: &SessionContext, replies: &[String]) {
        if replies.is_empty() {
            self.emit(ChatEvent::TypingStopped);
            return;
        }

        for (index, reply) in replies.iter().enumerate() {
            if index > 0 {
                self.deps
                    .scheduler
                    .sleep(self.config.inter_message_gap())
                    .await;
                self.emit(ChatEvent::TypingStarted);
            }
            let delay = self.config.typing.delay(reply);
            self.deps.scheduler.sleep(delay).await;

            {
                let mut state = self.state.lock().await;
                let message = ChatMessage::assistant(reply.as_str());
                let id = state.transcript.push(message.clone());
                self.emit(ChatEvent::BotMessage { id, message });
                self.emit(ChatEvent::TypingStopped);
            }

            if self.config.persist_replies {
                let turn = StoredTurn::new(&context.session_id, MessageRole::Assistant, reply);
                if let Err(err) = self.deps.conversations.append(&turn).await {
                    tracing::warn!("[GuestChat] Failed to store reply: {}", err);
                }
            }
        }
    }

    /// Undoes the optimistic rendering of a failed batch.
    async fn roll_back(self: &Arc<Self>, batch: &Batch, err: &RiyaError) {
        tracing::warn!(
            "[GuestChat] Flush of {} message(s) failed, rolling back: {}",
            batch.len(),
            err
        );
        let rearm = {
            let mut state = self.state.lock().await;
            let ids = batch.ids();
            state.transcript.remove(&ids);
            self.emit(ChatEvent::TypingStopped);
            self.emit(ChatEvent::BatchRolledBack { ids });
            self.emit(ChatEvent::TransientFailure {
                message: failure_notice(err),
            });
            state.queue.abort_flush().then(|| state.queue.generation())
        };
        if let Some(generation) = rearm {
            self.arm_timer(generation);
        }
    }

    /// Drops messages that were queued before the gate blocked.
    fn suppress_pending(&self, state: &mut ChatState) -> FlushReport {
        let batch = match state.queue.begin_flush() {
            Ok(batch) => batch,
            Err(skip) => return FlushReport::Skipped(skip),
        };
        let ids = batch.ids();
        state.transcript.remove(&ids);
        state.queue.abort_flush();
        self.emit(ChatEvent::BatchRolledBack { ids });
        let prompt = LoginPrompt::limit_reached(state.gate.count(), state.gate.limit());
        self.raise_prompt(state, prompt);
        FlushReport::Suppressed {
            dropped: batch.len(),
        }
    }

    // ============================================================================
    // Login prompt and conversion
    // ============================================================================

    /// Shows the dismissible prompt for a feature reserved to signed-in users.
    ///
    /// The message count is not touched. If the blocking limit prompt is
    /// already up, it stays and is returned instead.
    pub async fn raise_locked_feature(&self, feature: &str) -> LoginPrompt {
        let mut state = self.state.lock().await;
        if let Some(active) = state.prompt.as_ref().filter(|p| !p.dismissible) {
            return active.clone();
        }
        let prompt = LoginPrompt::locked_feature(feature);
        self.raise_prompt(&mut state, prompt.clone());
        prompt
    }

    /// Closes the active prompt if it can be dismissed.
    ///
    /// # Returns
    ///
    /// `true` if a prompt was closed. The limit prompt is never dismissible.
    pub async fn dismiss_prompt(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.prompt.as_ref().is_some_and(|p| p.dismissible) {
            return false;
        }
        state.prompt = None;
        self.emit(ChatEvent::PromptDismissed);
        true
    }

    /// Applies a successful external sign-in: gating ends for this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the guest record cannot be stored; the session
    /// then stays in guest mode.
    pub async fn mark_converted(&self, user_id: &str) -> Result<()> {
        let (session_id, count) = {
            let state = self.state.lock().await;
            (state.context.session_id.clone(), state.gate.count())
        };

        let mut record = self
            .deps
            .guest_records
            .find(&session_id)
            .await?
            .unwrap_or_else(|| GuestRecord::new(&session_id));
        record.message_count = record.message_count.max(count);
        record.mark_converted(user_id);
        self.deps.guest_records.save(&record).await?;

        let mut state = self.state.lock().await;
        state.unsaved_count = 0;
        state.gate.mark_converted();
        state.context.user_id = Some(user_id.to_string());
        if state.prompt.take().is_some() {
            self.emit(ChatEvent::PromptDismissed);
        }
        self.emit(ChatEvent::Converted {
            user_id: user_id.to_string(),
        });
        self.emit(ChatEvent::GateUpdated {
            state: state.gate.state(),
            remaining: state.gate.remaining(),
        });
        tracing::info!("[GuestChat] Session {} converted to {}", session_id, user_id);
        Ok(())
    }

    fn raise_prompt(&self, state: &mut ChatState, prompt: LoginPrompt) {
        state.prompt = Some(prompt.clone());
        self.emit(ChatEvent::PromptRaised(prompt));
    }

    fn emit(&self, event: ChatEvent) {
        // A closed receiver only means nobody is rendering anymore
        let _ = self.events.send(event);
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub async fn context(&self) -> SessionContext {
        self.state.lock().await.context.clone()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.state.lock().await.transcript.messages()
    }

    pub async fn gate_state(&self) -> GateState {
        self.state.lock().await.gate.state()
    }

    pub async fn message_count(&self) -> u32 {
        self.state.lock().await.gate.count()
    }

    pub async fn remaining(&self) -> Option<u32> {
        self.state.lock().await.gate.remaining()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.queue.pending_len()
    }

    pub async fn is_flush_in_flight(&self) -> bool {
        self.state.lock().await.queue.is_in_flight()
    }

    pub async fn active_prompt(&self) -> Option<LoginPrompt> {
        self.state.lock().await.prompt.clone()
    }

    pub async fn pending_greeting(&self) -> Option<String> {
        self.state.lock().await.pending_greeting.clone()
    }

    pub async fn unsaved_count(&self) -> u32 {
        self.state.lock().await.unsaved_count
    }

    pub async fn quick_replies(&self) -> Vec<String> {
        self.state.lock().await.quick_replies.clone()
    }
}

/// User-facing text for a failed flush.
fn failure_notice(err: &RiyaError) -> String {
    match err {
        RiyaError::Timeout { .. } => {
            "Riya is taking too long to reply. Please send that again.".to_string()
        }
        _ => "Something went wrong, your last messages were not sent. Please try again."
            .to_string(),
    }
}
