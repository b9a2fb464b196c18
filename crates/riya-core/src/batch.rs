//! Message batching queue with a single-flight guard.
//!
//! Users often fire several short messages in a row. Instead of one backend
//! round-trip per message, sends are collected here and flushed together
//! once the quiet period passes.
//!
//! The queue itself owns no timer. Every `enqueue` bumps a generation number;
//! the orchestrator arms a timer tagged with that generation and, on expiry,
//! only flushes if the generation is still current. The single-flight rule
//! is the `FlightState` transition guard: `begin_flush` moves `Idle` to
//! `InFlight`, and only `finish_flush`/`abort_flush` move it back.

use serde::{Deserialize, Serialize};

use crate::message::MessageId;

/// A queued message together with the transcript entry that renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: MessageId,
    pub text: String,
}

/// Messages drained from the queue for one flush, in send order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    messages: Vec<PendingMessage>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages.iter().map(|m| m.text.clone()).collect()
    }

    pub fn ids(&self) -> Vec<MessageId> {
        self.messages.iter().map(|m| m.id).collect()
    }

    pub fn messages(&self) -> &[PendingMessage] {
        &self.messages
    }
}

/// Whether a flush is currently talking to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    #[default]
    Idle,
    InFlight { size: usize },
}

/// Why `begin_flush` did not produce a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushSkip {
    /// Another flush is still in flight.
    InFlight,
    /// Nothing queued.
    Empty,
    /// A later send restarted the quiet period this flush was timed for.
    Superseded,
}

/// Pending-message buffer for one chat session.
#[derive(Debug, Default)]
pub struct BatchQueue {
    pending: Vec<PendingMessage>,
    flight: FlightState,
    generation: u64,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message and returns the generation the quiet timer must carry.
    pub fn enqueue(&mut self, id: MessageId, text: impl Into<String>) -> u64 {
        self.pending.push(PendingMessage {
            id,
            text: text.into(),
        });
        self.generation += 1;
        self.generation
    }

    /// True if no `enqueue` happened since `generation` was handed out.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn flight(&self) -> FlightState {
        self.flight
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.flight, FlightState::InFlight { .. })
    }

    /// Drains everything queued so far and marks the queue in flight.
    ///
    /// The pending list is emptied before the caller starts any async work,
    /// so messages queued during the flush land in the next batch.
    pub fn begin_flush(&mut self) -> Result<Batch, FlushSkip> {
        if self.is_in_flight() {
            return Err(FlushSkip::InFlight);
        }
        if self.pending.is_empty() {
            return Err(FlushSkip::Empty);
        }
        let messages = std::mem::take(&mut self.pending);
        self.flight = FlightState::InFlight {
            size: messages.len(),
        };
        Ok(Batch { messages })
    }

    /// Marks the in-flight batch as accepted.
    ///
    /// Returns true when messages arrived during the flight and the quiet
    /// timer has to be re-armed for them.
    pub fn finish_flush(&mut self) -> bool {
        self.flight = FlightState::Idle;
        !self.pending.is_empty()
    }

    /// Marks the in-flight batch as failed. The batch is not re-queued;
    /// the caller rolls its transcript entries back instead.
    pub fn abort_flush(&mut self) -> bool {
        self.flight = FlightState::Idle;
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(texts: &[&str]) -> BatchQueue {
        let mut queue = BatchQueue::new();
        for (i, text) in texts.iter().enumerate() {
            queue.enqueue(MessageId(i as u64), *text);
        }
        queue
    }

    #[test]
    fn test_drains_in_order() {
        let mut queue = queue_with(&["a", "b", "c"]);
        let batch = queue.begin_flush().unwrap();
        assert_eq!(batch.texts(), vec!["a", "b", "c"]);
        assert_eq!(batch.ids(), vec![MessageId(0), MessageId(1), MessageId(2)]);
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.flight(), FlightState::InFlight { size: 3 });
    }

    #[test]
    fn test_second_flush_while_in_flight_is_noop() {
        let mut queue = queue_with(&["a"]);
        queue.begin_flush().unwrap();
        queue.enqueue(MessageId(9), "late");
        assert_eq!(queue.begin_flush(), Err(FlushSkip::InFlight));
        // the late message is still waiting
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn test_empty_flush_skipped() {
        let mut queue = BatchQueue::new();
        assert_eq!(queue.begin_flush(), Err(FlushSkip::Empty));
        assert_eq!(queue.flight(), FlightState::Idle);
    }

    #[test]
    fn test_finish_reports_rearm() {
        let mut queue = queue_with(&["a"]);
        queue.begin_flush().unwrap();
        assert!(!queue.finish_flush());

        queue.enqueue(MessageId(1), "b");
        queue.begin_flush().unwrap();
        queue.enqueue(MessageId(2), "c");
        assert!(queue.finish_flush());
        assert_eq!(queue.begin_flush().unwrap().texts(), vec!["c"]);
    }

    #[test]
    fn test_abort_releases_guard() {
        let mut queue = queue_with(&["a", "b"]);
        queue.begin_flush().unwrap();
        assert!(!queue.abort_flush());
        assert_eq!(queue.flight(), FlightState::Idle);

        queue.enqueue(MessageId(5), "retry");
        assert_eq!(queue.begin_flush().unwrap().texts(), vec!["retry"]);
    }

    #[test]
    fn test_generation_tracks_latest_enqueue() {
        let mut queue = BatchQueue::new();
        let first = queue.enqueue(MessageId(0), "a");
        assert!(queue.is_current(first));
        let second = queue.enqueue(MessageId(1), "b");
        assert!(!queue.is_current(first));
        assert!(queue.is_current(second));
    }
}
