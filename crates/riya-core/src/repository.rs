//! Repository traits for the hosted datastore.
//!
//! Both stores are opaque collaborators. The orchestrator only appends turns
//! and adjusts the guest counter; it never edits or deletes rows.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::StoredTurn;
use crate::session::GuestRecord;

/// Append-only conversation rows.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Appends one row.
    async fn append(&self, turn: &StoredTurn) -> Result<()>;

    /// Appends `turns` as one unit: either every row is stored or none is.
    ///
    /// # Arguments
    ///
    /// * `turns` - Rows of a single session, oldest first
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the rows span more than one session.
    async fn append_all(&self, turns: &[StoredTurn]) -> Result<()>;

    /// Lists all rows for `session_id`, oldest first.
    async fn list(&self, session_id: &str) -> Result<Vec<StoredTurn>>;
}

/// Guest bookkeeping keyed by session id.
#[async_trait]
pub trait GuestRecordStore: Send + Sync {
    /// Finds the record for `session_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: Record found
    /// - `Ok(None)`: First visit
    /// - `Err(_)`: Store failure
    async fn find(&self, session_id: &str) -> Result<Option<GuestRecord>>;

    /// Inserts or replaces the record.
    async fn save(&self, record: &GuestRecord) -> Result<()>;

    /// Adds `accepted` to the stored count, creating the record if missing,
    /// and returns the updated record.
    async fn increment(&self, session_id: &str, accepted: u32) -> Result<GuestRecord>;
}
