//! Interface language preference.

use coffee_house_core::Language;
use tracing::{debug, warn};

use crate::storage::{SharedStore, StorageError, keys};

/// Persists the interface language in the `language` slot.
#[derive(Clone)]
pub struct LanguageStore {
    storage: SharedStore,
}

impl LanguageStore {
    #[must_use]
    pub const fn new(storage: SharedStore) -> Self {
        Self { storage }
    }

    /// The saved language, or the default when missing or unrecognized.
    #[must_use]
    pub fn language(&self) -> Language {
        let raw = match self.storage.get(keys::LANGUAGE) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Language::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read language preference");
                return Language::default();
            }
        };

        Language::from_code(raw.trim()).unwrap_or_else(|| {
            debug!(code = %raw, "Unrecognized language code, using default");
            Language::default()
        })
    }

    /// Save `language`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot cannot be written.
    pub fn set(&self, language: Language) -> Result<(), StorageError> {
        self.storage.set(keys::LANGUAGE, language.code())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_to_khmer() {
        let store = LanguageStore::new(MemoryStore::shared());
        assert_eq!(store.language(), Language::Km);
    }

    #[test]
    fn test_roundtrip() {
        let store = LanguageStore::new(MemoryStore::shared());
        store.set(Language::En).unwrap();
        assert_eq!(store.language(), Language::En);
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let storage = MemoryStore::shared();
        storage.set(keys::LANGUAGE, "fr").unwrap();
        assert_eq!(LanguageStore::new(storage).language(), Language::Km);
    }

    #[test]
    fn test_slot_holds_bare_code() {
        let storage = MemoryStore::shared();
        let store = LanguageStore::new(Arc::clone(&storage));
        store.set(Language::En).unwrap();
        assert_eq!(storage.get(keys::LANGUAGE).unwrap().as_deref(), Some("en"));

        storage.set(keys::LANGUAGE, "km").unwrap();
        assert_eq!(store.language(), Language::Km);
        storage.set(keys::LANGUAGE, "en").unwrap();
        assert_eq!(store.language(), Language::En);
    }
}
