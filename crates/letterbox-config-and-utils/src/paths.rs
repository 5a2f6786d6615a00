//! File system paths.

use crate::{CoreError, CoreResult, ParticipantId};
use std::path::{Path, PathBuf};

/// Suffix appended to a participant id to name its store file.
pub const STORE_FILE_SUFFIX: &str = "_storage.db";

/// Manages file system paths for Letterbox.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for runtime files (~/.letterbox)
    base_dir: PathBuf,
    /// Directory holding every participant's store file
    store_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.letterbox`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;
        Ok(Self::with_base_dir(home.join(".letterbox")))
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            store_dir: base_dir.join("stores"),
            base_dir,
        }
    }

    /// Replace the store directory, keeping the base directory.
    pub fn with_store_dir(mut self, store_dir: PathBuf) -> Self {
        self.store_dir = store_dir;
        self
    }

    /// Get the base directory (~/.letterbox).
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the store directory (~/.letterbox/stores).
    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Get the config file path (~/.letterbox/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the logs directory (~/.letterbox/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the central log file path (~/.letterbox/logs/letterbox.jsonl).
    pub fn log_file(&self) -> PathBuf {
        self.logs_dir().join("letterbox.jsonl")
    }

    /// Store file for a participant: `{store_dir}/{id}_storage.db`.
    pub fn store_file(&self, participant: &ParticipantId) -> PathBuf {
        store_file_in(&self.store_dir, participant)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(&self.store_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

/// Pure mapping from participant id to store location inside `dir`.
pub(crate) fn store_file_in(dir: &Path, participant: &ParticipantId) -> PathBuf {
    dir.join(format!("{}{}", participant.as_str(), STORE_FILE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn store_file_is_deterministic() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/lb"));
        let alice = ParticipantId::parse("Alice").unwrap();
        assert_eq!(
            paths.store_file(&alice),
            PathBuf::from("/tmp/lb/stores/alice_storage.db")
        );
        assert_eq!(paths.store_file(&alice), paths.store_file(&alice));
    }

    #[test]
    fn with_store_dir_overrides_only_stores() {
        let paths = Paths::with_base_dir(PathBuf::from("/tmp/lb"))
            .with_store_dir(PathBuf::from("/srv/stores"));
        assert_eq!(paths.base_dir(), Path::new("/tmp/lb"));
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/lb/config.json"));
        let bob = ParticipantId::parse("bob").unwrap();
        assert_eq!(
            paths.store_file(&bob),
            PathBuf::from("/srv/stores/bob_storage.db")
        );
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("lb"));
        paths.ensure_dirs().unwrap();
        assert!(paths.store_dir().is_dir());
        assert!(paths.logs_dir().is_dir());
    }
}
