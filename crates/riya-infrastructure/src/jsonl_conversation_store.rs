//! JSON-lines ConversationStore implementation.
//!
//! One file per session, one `StoredTurn` per line. Appends never rewrite
//! earlier lines, so file order is creation order.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use riya_core::message::StoredTurn;
use riya_core::repository::ConversationStore;
use riya_core::{Result, RiyaError};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::paths::session_file_stem;

pub struct JsonlConversationStore {
    conversations_dir: PathBuf,
}

impl JsonlConversationStore {
    pub fn new(conversations_dir: impl AsRef<Path>) -> Result<Self> {
        let conversations_dir = conversations_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&conversations_dir).map_err(|e| {
            RiyaError::io(format!(
                "Failed to create conversations directory {}: {e}",
                conversations_dir.display()
            ))
        })?;
        Ok(Self { conversations_dir })
    }

    fn file_path(&self, session_id: &str) -> PathBuf {
        self.conversations_dir
            .join(format!("{}.jsonl", session_file_stem(session_id)))
    }

    /// Writes `turns` to the session file with a single `write_all`.
    ///
    /// If the file ends in a torn line, a newline is written first so the
    /// new rows start on a line of their own.
    async fn write_turns(&self, session_id: &str, turns: &[StoredTurn]) -> Result<()> {
        let mut lines = String::new();
        for turn in turns {
            lines.push_str(&serde_json::to_string(turn)?);
            lines.push('\n');
        }

        let path = self.file_path(session_id);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| RiyaError::data_access(format!("Failed to open {}: {e}", path.display())))?;
        if ends_mid_line(&mut file).await? {
            tracing::warn!("[Store] Terminating torn last line in {}", path.display());
            lines.insert(0, '\n');
        }
        file.write_all(lines.as_bytes())
            .await
            .map_err(|e| RiyaError::data_access(format!("Failed to append to {}: {e}", path.display())))?;
        file.flush().await?;
        Ok(())
    }
}

/// True if the file is non-empty and its last byte is not a newline.
async fn ends_mid_line(file: &mut File) -> Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

#[async_trait]
impl ConversationStore for JsonlConversationStore {
    async fn append(&self, turn: &StoredTurn) -> Result<()> {
        self.write_turns(&turn.session_id, std::slice::from_ref(turn)).await
    }

    async fn append_all(&self, turns: &[StoredTurn]) -> Result<()> {
        let Some(first) = turns.first() else {
            return Ok(());
        };
        if turns.iter().any(|t| t.session_id != first.session_id) {
            return Err(RiyaError::invalid_input("append_all rows must belong to one session"));
        }
        self.write_turns(&first.session_id, turns).await
    }

    async fn list(&self, session_id: &str) -> Result<Vec<StoredTurn>> {
        let path = self.file_path(session_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut turns = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredTurn>(line) {
                Ok(turn) => turns.push(turn),
                Err(e) => {
                    // A torn final line from a crash mid-append is skipped, not fatal
                    tracing::warn!(
                        "[Store] Skipping unreadable line {} in {}: {}",
                        index + 1,
                        path.display(),
                        e
                    );
                }
            }
        }
        Ok(turns)
    }
}
