//! Storage backends for the persisted note collection.
//!
//! The whole collection lives under a single key. On the web that key sits in
//! `window.localStorage` behind a fixed prefix; natively and in tests an
//! in-memory map stands in. Access is synchronous on every backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
#[cfg(feature = "tracing")]
use tracing::error;
use web_sys::Storage;

/// Key under which the note collection is persisted.
pub const KEY_NOTES: &str = "notes";

const LOCAL_STORAGE_PREFIX: &str = "time-capsule-";

/// The error type for storage backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend cannot be reached at all (e.g. localStorage is disabled).
    #[error("storage backend is unavailable")]
    Unavailable,
    /// The backend rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Trait for persisting the note collection.
pub trait CapsuleStorage {
    /// Retrieves a stored value by key.
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores a key-value pair, overwriting any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a stored value by key. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Storage backed by the browser's `window.localStorage`.
///
/// Keys are namespaced with a fixed prefix so the entry coexists with whatever
/// else the page keeps in local storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        LocalStorage
    }

    fn local_storage(&self) -> Option<Storage> {
        match gloo_utils::window().local_storage() {
            Ok(storage) => storage,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                error!("Could not find local storage: {_e:?}");
                None
            }
        }
    }
}

impl CapsuleStorage for LocalStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let local_storage = self.local_storage().ok_or(StorageError::Unavailable)?;
        let key = format!("{LOCAL_STORAGE_PREFIX}{key}");
        local_storage
            .get_item(&key)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let local_storage = self.local_storage().ok_or(StorageError::Unavailable)?;
        let key = format!("{LOCAL_STORAGE_PREFIX}{key}");
        local_storage
            .set_item(&key, value)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let local_storage = self.local_storage().ok_or(StorageError::Unavailable)?;
        let key = format!("{LOCAL_STORAGE_PREFIX}{key}");
        local_storage
            .remove_item(&key)
            .map_err(|e| StorageError::Backend(format!("{e:?}")))
    }
}

/// In-memory storage; clones share the same entries.
///
/// The native stand-in for [`LocalStorage`], and the backend tests run against.
/// Contents do not outlive the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CapsuleStorage for MemoryStorage {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Unavailable)?;
        entries.remove(key);
        Ok(())
    }
}

/// Enum for selecting the type of storage to use for
/// [`CapsuleStore`](crate::CapsuleStore).
#[derive(Debug, Clone)]
pub enum CapsuleStorageType {
    LocalStorage(LocalStorage),
    Memory(MemoryStorage),
}

impl Default for CapsuleStorageType {
    fn default() -> Self {
        CapsuleStorageType::LocalStorage(LocalStorage::new())
    }
}

impl From<LocalStorage> for CapsuleStorageType {
    fn from(storage: LocalStorage) -> Self {
        CapsuleStorageType::LocalStorage(storage)
    }
}

impl From<MemoryStorage> for CapsuleStorageType {
    fn from(storage: MemoryStorage) -> Self {
        CapsuleStorageType::Memory(storage)
    }
}

impl CapsuleStorage for CapsuleStorageType {
    fn get(&mut self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            CapsuleStorageType::LocalStorage(storage) => storage.get(key),
            CapsuleStorageType::Memory(storage) => storage.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            CapsuleStorageType::LocalStorage(storage) => storage.set(key, value),
            CapsuleStorageType::Memory(storage) => storage.set(key, value),
        }
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match self {
            CapsuleStorageType::LocalStorage(storage) => storage.remove(key),
            CapsuleStorageType::Memory(storage) => storage.remove(key),
        }
    }
}
