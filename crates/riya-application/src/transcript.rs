//! Visible message list of one chat session.

use riya_core::message::{ChatMessage, MessageId, StoredTurn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub id: MessageId,
    pub message: ChatMessage,
}

/// Ordered transcript with stable entry ids.
///
/// Entries are only ever appended, except for a rollback which removes the
/// exact ids of a failed batch.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    next_id: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the transcript from stored rows, oldest first.
    pub fn from_history(turns: &[StoredTurn]) -> Self {
        let mut transcript = Self::new();
        for turn in turns {
            transcript.push(turn.to_message());
        }
        transcript
    }

    pub fn push(&mut self, message: ChatMessage) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.entries.push(TranscriptEntry { id, message });
        id
    }

    /// Removes the entries with the given ids and returns how many were removed.
    pub fn remove(&mut self, ids: &[MessageId]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !ids.contains(&entry.id));
        before - self.entries.len()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riya_core::message::MessageRole;

    #[test]
    fn test_remove_only_targets_given_ids() {
        let mut transcript = Transcript::new();
        let greeting = transcript.push(ChatMessage::assistant("hello"));
        let a = transcript.push(ChatMessage::user("a"));
        let b = transcript.push(ChatMessage::user("b"));
        let late = transcript.push(ChatMessage::user("late"));

        assert_eq!(transcript.remove(&[a, b]), 2);

        let ids: Vec<_> = transcript.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![greeting, late]);
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut transcript = Transcript::new();
        let a = transcript.push(ChatMessage::user("a"));
        transcript.remove(&[a]);
        let b = transcript.push(ChatMessage::user("b"));
        assert!(b > a);
    }

    #[test]
    fn test_from_history_keeps_order() {
        let turns = vec![
            StoredTurn::new("g", MessageRole::Assistant, "hi"),
            StoredTurn::new("g", MessageRole::User, "yo"),
        ];
        let transcript = Transcript::from_history(&turns);
        let texts: Vec<_> = transcript.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["hi", "yo"]);
    }
}
