//! TOML-based GuestRecordStore implementation.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use riya_core::repository::GuestRecordStore;
use riya_core::session::GuestRecord;
use riya_core::{Result, RiyaError};

use crate::paths::session_file_stem;
use crate::storage::AtomicTomlFile;

/// Stores each guest record as its own TOML file.
///
/// ```text
/// sessions/
/// ├── guest-4f1c....toml
/// └── guest-9a02....toml
/// ```
pub struct TomlGuestRecordStore {
    sessions_dir: PathBuf,
}

impl TomlGuestRecordStore {
    /// Creates the store, making sure `sessions_dir` exists.
    pub fn new(sessions_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        fs::create_dir_all(&sessions_dir).map_err(|e| {
            RiyaError::io(format!(
                "Failed to create sessions directory {}: {e}",
                sessions_dir.display()
            ))
        })?;
        Ok(Self { sessions_dir })
    }

    fn file(&self, session_id: &str) -> AtomicTomlFile<GuestRecord> {
        AtomicTomlFile::new(
            self.sessions_dir
                .join(format!("{}.toml", session_file_stem(session_id))),
        )
    }
}

#[async_trait]
impl GuestRecordStore for TomlGuestRecordStore {
    async fn find(&self, session_id: &str) -> Result<Option<GuestRecord>> {
        Ok(self.file(session_id).load()?)
    }

    async fn save(&self, record: &GuestRecord) -> Result<()> {
        self.file(&record.session_id).save(record)?;
        tracing::debug!(
            "[Store] Saved guest record {} (count={})",
            record.session_id,
            record.message_count
        );
        Ok(())
    }

    async fn increment(&self, session_id: &str, accepted: u32) -> Result<GuestRecord> {
        let record = self.file(session_id).update(
            || GuestRecord::new(session_id),
            |record| record.add_messages(accepted),
        )?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlGuestRecordStore::new(temp_dir.path()).unwrap();
        assert!(store.find("guest-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_creates_and_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlGuestRecordStore::new(temp_dir.path()).unwrap();

        assert_eq!(store.increment("guest-1", 2).await.unwrap().message_count, 2);
        assert_eq!(store.increment("guest-1", 3).await.unwrap().message_count, 5);

        let loaded = store.find("guest-1").await.unwrap().unwrap();
        assert_eq!(loaded.message_count, 5);
        assert!(!loaded.converted);
    }

    #[tokio::test]
    async fn test_save_round_trips_conversion() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlGuestRecordStore::new(temp_dir.path()).unwrap();

        let mut record = GuestRecord::new("guest-2");
        record.add_messages(25);
        record.mark_converted("user-77");
        store.save(&record).await.unwrap();

        assert_eq!(store.find("guest-2").await.unwrap().unwrap(), record);
    }
}
