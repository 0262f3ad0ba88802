//! REST client for the Coffee House backend.
//!
//! # Architecture
//!
//! - One `reqwest` client shared behind an `Arc`, cheap to clone
//! - `Authorization: Bearer` attached from the [`TokenStore`] when present;
//!   a 401 response clears the stored token
//! - Merchant info cached via `moka` (5 minute TTL)
//! - Error bodies of the form `{"detail": ...}` surface as [`ApiError::detail`]
//!
//! The client implements [`OrderGateway`](crate::order::OrderGateway) and
//! [`PaymentGateway`](crate::payment::PaymentGateway).

mod khqr;
mod orders;

use std::sync::Arc;
use std::time::Duration;

use coffee_house_core::ProductId;
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use url::Url;

use crate::auth::TokenStore;
use crate::cart::Product;
use crate::config::StorefrontConfig;
use crate::payment::MerchantInfo;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status}{}", format_detail(.detail))]
    Api { status: u16, detail: Option<String> },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// The backend's human-readable `detail`, if it sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a backend rejection.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

#[allow(clippy::ref_option)]
fn format_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" - {d}"))
        .unwrap_or_default()
}

const MERCHANT_INFO_KEY: &str = "merchant-info";

/// Client for the Coffee House REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    asset_origin: String,
    tokens: TokenStore,
    static_qr: Option<String>,
    merchant_cache: Cache<&'static str, MerchantInfo>,
}

impl ApiClient {
    /// Create a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StorefrontConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let merchant_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: with_trailing_slash(&config.api_url),
                asset_origin: config.asset_origin(),
                tokens,
                static_qr: config.static_qr.clone(),
                merchant_cache,
            }),
        })
    }

    /// The session token store used for requests.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Resolve a product image path against the asset origin.
    ///
    /// Absolute `http(s)` URLs pass through; blank paths resolve to `None`.
    #[must_use]
    pub fn image_url(&self, path: Option<&str>) -> Option<String> {
        resolve_image_url(&self.inner.asset_origin, path)
    }

    /// List catalog products.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint("products/")?;
        self.send(self.request(Method::GET, url)).await
    }

    /// Fetch a single product.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let url = self.endpoint(&format!("products/{id}/"))?;
        self.send(self.request(Method::GET, url)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.inner.base_url.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.inner.client.request(method, url);
        match self.inner.tokens.token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a JSON success body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!("Backend rejected the session token, signing out");
            if let Err(e) = self.inner.tokens.clear() {
                warn!(error = %e, "Failed to clear access token");
            }
        }

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Parse(e.to_string())
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("static_qr", &self.inner.static_qr.is_some())
            .finish_non_exhaustive()
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Pull a readable message out of an error body.
///
/// Accepts `{"detail": "..."}` and the list form
/// `{"detail": [{"msg": "..."}, ...]}` used for request validation errors.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn resolve_image_url(origin: &str, path: Option<&str>) -> Option<String> {
    let path = path.map(str::trim).filter(|p| !p.is_empty())?;
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let separator = if path.starts_with('/') { "" } else { "/" };
    Some(format!("{origin}{separator}{path}"))
}
