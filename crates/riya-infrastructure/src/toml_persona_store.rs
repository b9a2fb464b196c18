//! Saved onboarding answers.

use std::path::{Path, PathBuf};

use riya_core::Result;
use riya_core::persona::OnboardingAnswers;

use crate::paths::RiyaPaths;
use crate::storage::AtomicTomlFile;

/// Keeps the user's onboarding answers in `persona.toml`.
pub struct TomlPersonaStore {
    file: AtomicTomlFile<OnboardingAnswers>,
}

impl TomlPersonaStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Uses `persona.toml` under the config directory.
    pub fn from_paths(paths: &RiyaPaths) -> Result<Self> {
        Ok(Self::new(paths.persona_file()?))
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns `None` until onboarding has been completed once.
    pub fn load(&self) -> Result<Option<OnboardingAnswers>> {
        Ok(self.file.load()?)
    }

    pub fn save(&self, answers: &OnboardingAnswers) -> Result<()> {
        self.file.save(answers)?;
        tracing::info!("[Store] Saved persona to {}", self.file.path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riya_core::persona::{LanguageStyle, Relationship};
    use tempfile::TempDir;

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = TomlPersonaStore::from_paths(&RiyaPaths::new(Some(temp_dir.path().to_path_buf())))
            .unwrap();
        assert!(store.load().unwrap().is_none());

        let answers = OnboardingAnswers {
            user_name: "Meera".into(),
            companion_name: "Riya".into(),
            relationship: Relationship::Sibling,
            personality: vec!["chill".into()],
            interests: vec![],
            language: LanguageStyle::English,
        };
        store.save(&answers).unwrap();
        assert_eq!(store.load().unwrap(), Some(answers));
        assert!(store.path().ends_with("persona.toml"));
    }
}
