//! In-memory store implementations.
//!
//! Used for ephemeral sessions (`storage.ephemeral = true`) and as test
//! doubles. Both support failure injection so tests can exercise the
//! persistence-failure rollback path.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use riya_core::message::StoredTurn;
use riya_core::repository::{ConversationStore, GuestRecordStore};
use riya_core::session::GuestRecord;
use riya_core::{Result, RiyaError};

fn lock_poisoned() -> RiyaError {
    RiyaError::internal("in-memory store lock poisoned")
}

pub struct InMemoryConversationStore {
    turns: Mutex<Vec<StoredTurn>>,
    fail_appends: AtomicBool,
    capacity: AtomicUsize,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self {
            turns: Mutex::new(Vec::new()),
            fail_appends: AtomicBool::new(false),
            capacity: AtomicUsize::new(usize::MAX),
        }
    }
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `append` fail until switched off again.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Fails any append that would take the store past `rows` rows in total.
    /// The failing call stores nothing.
    pub fn set_row_capacity(&self, rows: usize) {
        self.capacity.store(rows, Ordering::SeqCst);
    }

    /// All rows across sessions, in append order.
    pub fn all(&self) -> Vec<StoredTurn> {
        self.turns.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, turn: &StoredTurn) -> Result<()> {
        self.append_all(std::slice::from_ref(turn)).await
    }

    async fn append_all(&self, turns: &[StoredTurn]) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RiyaError::data_access("conversation store unavailable"));
        }
        if let Some(first) = turns.first() {
            if turns.iter().any(|t| t.session_id != first.session_id) {
                return Err(RiyaError::invalid_input(
                    "append_all rows must belong to one session",
                ));
            }
        }
        let mut stored = self.turns.lock().map_err(|_| lock_poisoned())?;
        if stored.len() + turns.len() > self.capacity.load(Ordering::SeqCst) {
            return Err(RiyaError::data_access("conversation store is full"));
        }
        stored.extend_from_slice(turns);
        Ok(())
    }

    async fn list(&self, session_id: &str) -> Result<Vec<StoredTurn>> {
        let turns = self.turns.lock().map_err(|_| lock_poisoned())?;
        Ok(turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryGuestRecordStore {
    records: Mutex<HashMap<String, GuestRecord>>,
    fail_increments: AtomicBool,
}

impl InMemoryGuestRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `increment` fail until switched off again.
    pub fn set_fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GuestRecordStore for InMemoryGuestRecordStore {
    async fn find(&self, session_id: &str) -> Result<Option<GuestRecord>> {
        let records = self.records.lock().map_err(|_| lock_poisoned())?;
        Ok(records.get(session_id).cloned())
    }

    async fn save(&self, record: &GuestRecord) -> Result<()> {
        let mut records = self.records.lock().map_err(|_| lock_poisoned())?;
        records.insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn increment(&self, session_id: &str, accepted: u32) -> Result<GuestRecord> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(RiyaError::data_access("guest record store unavailable"));
        }
        let mut records = self.records.lock().map_err(|_| lock_poisoned())?;
        let record = records
            .entry(session_id.to_string())
            .or_insert_with(|| GuestRecord::new(session_id));
        record.add_messages(accepted);
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riya_core::message::MessageRole;

    #[tokio::test]
    async fn test_failure_injection() {
        let store = InMemoryConversationStore::new();
        store.set_fail_appends(true);
        let turn = StoredTurn::new("g-1", MessageRole::User, "hi");
        assert!(store.append(&turn).await.is_err());

        store.set_fail_appends(false);
        store.append(&turn).await.unwrap();
        assert_eq!(store.list("g-1").await.unwrap(), vec![turn]);
    }

    #[tokio::test]
    async fn test_append_all_over_capacity_stores_nothing() {
        let store = InMemoryConversationStore::new();
        store.set_row_capacity(2);
        let rows = vec![
            StoredTurn::new("g-1", MessageRole::Assistant, "hello"),
            StoredTurn::new("g-1", MessageRole::User, "a"),
            StoredTurn::new("g-1", MessageRole::User, "b"),
        ];
        assert!(store.append_all(&rows).await.is_err());
        assert!(store.all().is_empty());

        store.append_all(&rows[..2]).await.unwrap();
        assert_eq!(store.list("g-1").await.unwrap(), rows[..2].to_vec());
    }

    #[tokio::test]
    async fn test_increment_failure_injection() {
        let store = InMemoryGuestRecordStore::new();
        store.set_fail_increments(true);
        assert!(store.increment("g-1", 2).await.is_err());
        assert!(store.find("g-1").await.unwrap().is_none());

        store.set_fail_increments(false);
        assert_eq!(store.increment("g-1", 2).await.unwrap().message_count, 2);
    }

    #[tokio::test]
    async fn test_increment_starts_from_zero() {
        let store = InMemoryGuestRecordStore::new();
        assert_eq!(store.increment("g-1", 4).await.unwrap().message_count, 4);
        assert_eq!(store.find("g-1").await.unwrap().unwrap().message_count, 4);
    }
}
