//! Local key-value persistence.
//!
//! Each concern (cart, language preference, session token) owns exactly one
//! slot, addressed by a fixed key from [`keys`]. Components depend on the
//! [`KeyValueStore`] port rather than on a concrete backend, so tests can
//! substitute [`MemoryStore`] for the on-disk [`FileStore`].

mod file;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

pub use file::FileStore;

/// Slot names.
pub mod keys {
    /// Serialized cart (JSON array of cart lines).
    pub const CART: &str = "cart";

    /// Two-letter interface language code.
    pub const LANGUAGE: &str = "language";

    /// Bearer token for the backend API.
    pub const ACCESS_TOKEN: &str = "access_token";
}

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on slot '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The key cannot be used as a slot name.
    #[error("invalid slot name: {0}")]
    InvalidKey(String),

    /// A lock guarding in-memory state was poisoned.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Synchronous key-value persistence port.
///
/// Writes complete before the call returns.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot. Missing slots return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Erase a slot. Erasing a missing slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStore = Arc<dyn KeyValueStore>;

/// In-memory store, used by tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind a [`SharedStore`] handle.
    #[must_use]
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.read().map_err(|_| StorageError::Poisoned)?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.write().map_err(|_| StorageError::Poisoned)?;
        slots.remove(key);
        Ok(())
    }
}
