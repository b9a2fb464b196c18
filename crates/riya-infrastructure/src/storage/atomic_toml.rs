//! Atomic TOML file handle.
//!
//! Writes go to a sibling temp file, are fsynced, then renamed over the
//! target. Read-modify-write cycles hold an exclusive `fs2` lock on a
//! `.lock` sibling so two processes sharing a data dir cannot lose a counter
//! increment.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use riya_core::RiyaError;
use serde::{Serialize, de::DeserializeOwned};

/// Errors that can occur during atomic TOML operations.
#[derive(Debug)]
pub enum AtomicTomlError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Lock(String),
}

impl std::fmt::Display for AtomicTomlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicTomlError::Io(e) => write!(f, "I/O error: {}", e),
            AtomicTomlError::Parse(e) => write!(f, "TOML parse error: {}", e),
            AtomicTomlError::Serialize(e) => write!(f, "TOML serialization error: {}", e),
            AtomicTomlError::Lock(e) => write!(f, "Lock error: {}", e),
        }
    }
}

impl std::error::Error for AtomicTomlError {}

impl From<std::io::Error> for AtomicTomlError {
    fn from(e: std::io::Error) -> Self {
        AtomicTomlError::Io(e)
    }
}

impl From<toml::de::Error> for AtomicTomlError {
    fn from(e: toml::de::Error) -> Self {
        AtomicTomlError::Parse(e)
    }
}

impl From<toml::ser::Error> for AtomicTomlError {
    fn from(e: toml::ser::Error) -> Self {
        AtomicTomlError::Serialize(e)
    }
}

impl From<AtomicTomlError> for RiyaError {
    fn from(e: AtomicTomlError) -> Self {
        match e {
            AtomicTomlError::Io(io) => io.into(),
            AtomicTomlError::Parse(parse) => parse.into(),
            AtomicTomlError::Serialize(ser) => ser.into(),
            AtomicTomlError::Lock(message) => RiyaError::data_access(message),
        }
    }
}

/// A typed handle to one TOML file.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(toml::from_str(&content)?))
    }

    /// Serializes `data` and replaces the file atomically.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Loads (or starts from `default_value`), applies `f`, saves, and returns
    /// the saved value. The whole cycle runs under the file lock.
    pub fn update<F>(&self, default_value: impl FnOnce() -> T, f: F) -> Result<T, AtomicTomlError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = match self.load()? {
            Some(data) => data,
            None => default_value(),
        };
        f(&mut data);
        self.save(&data)?;

        Ok(data)
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let invalid = |what: &str| {
            AtomicTomlError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Path has no {what}"),
            ))
        };
        let parent = self.path.parent().ok_or_else(|| invalid("parent directory"))?;
        let file_name = self.path.file_name().ok_or_else(|| invalid("file name"))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive lock guard, released (and its file removed) on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|e| AtomicTomlError::Lock(format!("Failed to acquire lock: {}", e)))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        session_id: String,
        count: u32,
    }

    fn fresh() -> Counter {
        Counter {
            session_id: "g-1".to_string(),
            count: 0,
        }
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_update_creates_then_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nested/g-1.toml"));

        let first = file.update(fresh, |c| c.count += 3).unwrap();
        assert_eq!(first.count, 3);
        let second = file.update(fresh, |c| c.count += 2).unwrap();
        assert_eq!(second.count, 5);

        assert_eq!(file.load().unwrap().unwrap(), second);
    }

    #[test]
    fn test_no_temp_or_lock_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("g-1.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());

        file.update(fresh, |c| c.count += 1).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".g-1.toml.tmp").exists());
        assert!(!temp_dir.path().join("g-1.lock").exists());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "count = [unclosed").unwrap();
        let file = AtomicTomlFile::<Counter>::new(path);

        let err: RiyaError = file.load().unwrap_err().into();
        assert!(matches!(err, RiyaError::Serialization { ref format, .. } if format == "TOML"));
    }
}
