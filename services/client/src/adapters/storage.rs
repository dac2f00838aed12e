//! services/client/src/adapters/storage.rs
//!
//! Concrete implementations of the `CredentialStore` port: a JSON file under the
//! client's state directory, and an in-memory map.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use studysearch_core::ports::{CredentialStore, PortError, PortResult, StorageKey};
use tracing::debug;

const SESSION_FILE_NAME: &str = "session.json";

//=========================================================================================
// File-backed store
//=========================================================================================

/// Persists the session entries as a flat JSON object in `<state_dir>/session.json`.
pub struct FileCredentialStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(SESSION_FILE_NAME),
            lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// A file that is missing or not a JSON object reads as empty.
    fn load(&self) -> PortResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!("Ignoring unreadable credential file {:?}: {}", self.path, e);
                BTreeMap::new()
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => {
                    Err(PortError::Unexpected(e.to_string()))
                }
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> PortResult<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))?;
        let mut entries = self.load()?;
        apply(&mut entries);
        self.save(&entries)
    }
}

impl CredentialStore for FileCredentialStore {
    fn read(&self, key: StorageKey) -> PortResult<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))?;
        Ok(self.load()?.remove(key.as_str()))
    }

    fn write(&self, key: StorageKey, value: &str) -> PortResult<()> {
        self.update(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: StorageKey) -> PortResult<()> {
        self.update(|entries| {
            entries.remove(key.as_str());
        })
    }
}

//=========================================================================================
// In-memory store
//=========================================================================================

/// Keeps entries for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<BTreeMap<&'static str, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> PortResult<std::sync::MutexGuard<'_, BTreeMap<&'static str, String>>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&self, key: StorageKey) -> PortResult<Option<String>> {
        Ok(self.entries()?.get(key.as_str()).cloned())
    }

    fn write(&self, key: StorageKey, value: &str) -> PortResult<()> {
        self.entries()?.insert(key.as_str(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> PortResult<()> {
        self.entries()?.remove(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        store.write(StorageKey::AccessToken, "T1").unwrap();
        store.write(StorageKey::RefreshToken, "T2").unwrap();

        let reopened = FileCredentialStore::new(dir.path());
        assert_eq!(
            reopened.read(StorageKey::AccessToken).unwrap().as_deref(),
            Some("T1")
        );
        assert_eq!(
            reopened.read(StorageKey::RefreshToken).unwrap().as_deref(),
            Some("T2")
        );
        assert_eq!(reopened.read(StorageKey::User).unwrap(), None);
    }

    #[test]
    fn removing_every_key_deletes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested"));
        store.write(StorageKey::User, "{}").unwrap();
        assert!(store.path().exists());

        store.remove(StorageKey::User).unwrap();
        assert!(!store.path().exists());
        // Removing from an absent file is fine.
        store.remove(StorageKey::AccessToken).unwrap();
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path());
        fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.read(StorageKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryCredentialStore::new();
        store.write(StorageKey::User, "u").unwrap();
        assert_eq!(store.read(StorageKey::User).unwrap().as_deref(), Some("u"));
        store.remove(StorageKey::User).unwrap();
        assert_eq!(store.read(StorageKey::User).unwrap(), None);
    }
}
