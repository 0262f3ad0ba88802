//! Session token persistence.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::storage::{SharedStore, StorageError, keys};

/// Holds the bearer token in the `access_token` slot.
#[derive(Clone)]
pub struct TokenStore {
    storage: SharedStore,
}

impl TokenStore {
    #[must_use]
    pub const fn new(storage: SharedStore) -> Self {
        Self { storage }
    }

    /// The stored token, if any. An unreadable slot counts as signed out.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        match self.storage.get(keys::ACCESS_TOKEN) {
            Ok(Some(raw)) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| SecretString::from(token.to_owned()))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    /// Store a token, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn set(&self, token: &SecretString) -> Result<(), StorageError> {
        self.storage.set(keys::ACCESS_TOKEN, token.expose_secret())
    }

    /// Forget the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be erased.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(keys::ACCESS_TOKEN)?;
        debug!("Access token cleared");
        Ok(())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_set_and_clear() {
        let tokens = TokenStore::new(MemoryStore::shared());
        assert!(!tokens.is_signed_in());

        tokens.set(&SecretString::from("abc.def")).unwrap();
        assert_eq!(tokens.token().unwrap().expose_secret(), "abc.def");

        tokens.clear().unwrap();
        assert!(tokens.token().is_none());
    }

    #[test]
    fn test_slot_holds_bare_token() {
        let storage = MemoryStore::shared();
        let tokens = TokenStore::new(Arc::clone(&storage));
        tokens.set(&SecretString::from("abc.def")).unwrap();
        assert_eq!(
            storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(),
            Some("abc.def")
        );

        storage.set(keys::ACCESS_TOKEN, "eyJhbGciOi.payload.sig").unwrap();
        assert_eq!(
            tokens.token().unwrap().expose_secret(),
            "eyJhbGciOi.payload.sig"
        );
    }

    #[test]
    fn test_blank_slot_is_signed_out() {
        let storage = MemoryStore::shared();
        storage.set(keys::ACCESS_TOKEN, "  ").unwrap();
        assert!(!TokenStore::new(storage).is_signed_in());
    }

    #[test]
    fn test_debug_redacts_token() {
        let tokens = TokenStore::new(MemoryStore::shared());
        tokens.set(&SecretString::from("super-secret")).unwrap();
        assert!(!format!("{tokens:?}").contains("super-secret"));
    }
}
