//! Storefront client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional.
//! - `COFFEE_API_URL` - Backend API base URL (default: `http://localhost:8000/api/v1`)
//! - `COFFEE_DATA_DIR` - Directory for the local key-value slots (default: `.coffee-house`)
//! - `COFFEE_TAX_RATE` - Tax as a fraction of the subtotal (default: 0.10)
//! - `COFFEE_FREE_DELIVERY_THRESHOLD` - Subtotal for free delivery (default: 50.00)
//! - `COFFEE_DELIVERY_FEE` - Delivery fee below the threshold (default: 2.99)
//! - `COFFEE_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 15)
//! - `KHQR_WINDOW_SECS` - Validity of a displayed QR code (default: 300)
//! - `KHQR_STATIC_QR` - Fixed QR reference shown instead of generating one
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use crate::payment::{DEFAULT_WINDOW_SECS, PaymentSettings};
use crate::totals::PricingPolicy;

/// Default backend API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Path suffix stripped from the API URL to find the asset origin.
const API_PATH_SUFFIX: &str = "/api/v1";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API base URL
    pub api_url: Url,
    /// Directory holding the persisted slots
    pub data_dir: PathBuf,
    /// Tax and delivery rules
    pub pricing: PricingPolicy,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
    /// KHQR session timing
    pub payment: PaymentSettings,
    /// Fixed QR reference, bypassing generation
    pub static_qr: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Defaults for every setting, pointed at `api_url`.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            data_dir: PathBuf::from(".coffee-house"),
            pricing: PricingPolicy::default(),
            http_timeout: Duration::from_secs(15),
            payment: PaymentSettings::default(),
            static_qr: None,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("COFFEE_API_URL", DEFAULT_API_URL))
            .map_err(|e| ConfigError::InvalidEnvVar("COFFEE_API_URL".to_string(), e))?;
        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            tax_rate: get_parsed("COFFEE_TAX_RATE", defaults.tax_rate)?,
            free_delivery_threshold: get_parsed(
                "COFFEE_FREE_DELIVERY_THRESHOLD",
                defaults.free_delivery_threshold,
            )?,
            delivery_fee: get_parsed("COFFEE_DELIVERY_FEE", defaults.delivery_fee)?,
        };
        validate_pricing(&pricing)?;

        let window_secs: u32 = get_parsed("KHQR_WINDOW_SECS", DEFAULT_WINDOW_SECS)?;
        if window_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "KHQR_WINDOW_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            data_dir: PathBuf::from(get_env_or_default("COFFEE_DATA_DIR", ".coffee-house")),
            pricing,
            http_timeout: Duration::from_secs(get_parsed("COFFEE_HTTP_TIMEOUT_SECS", 15)?),
            payment: PaymentSettings {
                window_secs,
                ..PaymentSettings::default()
            },
            static_qr: get_optional_env("KHQR_STATIC_QR"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Origin serving uploaded assets: the API URL without `/api/v1`.
    #[must_use]
    pub fn asset_origin(&self) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        base.strip_suffix(API_PATH_SUFFIX).unwrap_or(base).to_string()
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        let api_url = Url::parse(DEFAULT_API_URL).expect("Invalid default API URL");
        Self::new(api_url)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the API base URL, requiring an `http(s)` scheme.
fn parse_api_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

/// Reject negative rates and amounts.
fn validate_pricing(pricing: &PricingPolicy) -> Result<(), ConfigError> {
    let checks = [
        ("COFFEE_TAX_RATE", pricing.tax_rate),
        (
            "COFFEE_FREE_DELIVERY_THRESHOLD",
            pricing.free_delivery_threshold,
        ),
        ("COFFEE_DELIVERY_FEE", pricing.delivery_fee),
    ];
    for (key, value) in checks {
        if value < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must not be negative (got {value})"),
            ));
        }
    }
    Ok(())
}
