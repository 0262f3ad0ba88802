//! Shared client state.

use std::sync::Arc;

use tracing::info;

use crate::api::ApiClient;
use crate::auth::TokenStore;
use crate::cart::CartStore;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::preferences::LanguageStore;
use crate::storage::{FileStore, SharedStore};

/// Everything a front-end needs: configuration, the local slots, and the
/// backend client.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    storage: SharedStore,
    api: ApiClient,
}

impl AppState {
    /// Create state backed by a [`FileStore`] in the configured data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the HTTP
    /// client fails to build.
    pub fn new(config: StorefrontConfig) -> Result<Self, AppError> {
        let storage: SharedStore = Arc::new(FileStore::open(&config.data_dir)?);
        info!(data_dir = %config.data_dir.display(), api_url = %config.api_url, "Storefront client ready");
        Self::with_storage(config, storage)
    }

    /// Create state over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_storage(config: StorefrontConfig, storage: SharedStore) -> Result<Self, AppError> {
        let api = ApiClient::new(&config, TokenStore::new(Arc::clone(&storage)))?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                storage,
                api,
            }),
        })
    }

    /// Get the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Open the cart store over the `cart` slot.
    #[must_use]
    pub fn cart_store(&self) -> CartStore {
        CartStore::open(Arc::clone(&self.inner.storage))
    }

    /// Get the session token store.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        self.inner.api.tokens()
    }

    /// Open the language preference store.
    #[must_use]
    pub fn languages(&self) -> LanguageStore {
        LanguageStore::new(Arc::clone(&self.inner.storage))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use coffee_house_core::Language;

    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_stores_share_one_backend() {
        let state =
            AppState::with_storage(StorefrontConfig::default(), MemoryStore::shared()).unwrap();
        state.languages().set(Language::En).unwrap();
        assert_eq!(state.languages().language(), Language::En);
        assert!(state.cart_store().cart().is_empty());
        assert!(!state.tokens().is_signed_in());
    }

    #[test]
    fn test_file_backed_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorefrontConfig {
            data_dir: dir.path().join("data"),
            ..StorefrontConfig::default()
        };
        let state = AppState::new(config).unwrap();
        assert!(dir.path().join("data").is_dir());
        assert_eq!(state.config().payment.window_secs, 300);
    }
}
