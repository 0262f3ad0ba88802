//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front-ends. Unexpected failures are
//! captured to Sentry via [`AppError::capture`]; [`AppError::user_message`]
//! never exposes internal details.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::CartError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::order::OrderError;
use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Local persistence failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart mutation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Backend request failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Order placement failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Checkout could not be submitted.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error indicates a bug or outage rather than user input.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        match self {
            Self::Storage(_) | Self::Cart(_) | Self::Internal(_) => true,
            Self::Api(e) | Self::Order(OrderError::Api(e)) => {
                e.status().is_none_or(|status| status >= 500)
            }
            Self::Order(OrderError::ClearCart { .. }) => true,
            Self::Config(_) | Self::Checkout(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Report unexpected errors to Sentry and log them.
    ///
    /// Returns the Sentry event id when the error was captured.
    pub fn capture(&self) -> Option<sentry::types::Uuid> {
        if !self.is_unexpected() {
            tracing::debug!(error = %self, "Expected error");
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Unexpected error"
        );
        Some(event_id)
    }

    /// Message safe to show to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Storage(_) | Self::Cart(_) => {
                "Could not save your changes. Please try again.".to_string()
            }
            Self::Api(e) => api_message(e),
            Self::Order(e) => e.user_message(),
            Self::Checkout(e) => e.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

fn api_message(error: &ApiError) -> String {
    if let Some(detail) = error.detail() {
        return detail.to_string();
    }
    match error.status() {
        Some(401) => "Your session has expired. Please sign in again.".to_string(),
        Some(404) => "Not found".to_string(),
        _ => "Could not reach Coffee House. Please try again.".to_string(),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::{Field, FieldErrors, ValidationError};

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Internal("lock poisoned at cart.rs:42".to_string());
        assert!(!err.user_message().contains("cart.rs"));

        let err = AppError::Storage(StorageError::Poisoned);
        assert!(!err.user_message().contains("poisoned"));
    }

    #[test]
    fn test_api_detail_is_surfaced() {
        let err = AppError::Api(ApiError::Api {
            status: 409,
            detail: Some("Duplicate order".to_string()),
        });
        assert_eq!(err.user_message(), "Duplicate order");
        assert!(!err.is_unexpected());
    }

    #[test]
    fn test_server_errors_are_unexpected() {
        let err = AppError::Api(ApiError::Api {
            status: 503,
            detail: None,
        });
        assert!(err.is_unexpected());
        assert_eq!(
            err.user_message(),
            "Could not reach Coffee House. Please try again."
        );
    }

    #[test]
    fn test_checkout_errors_are_expected() {
        let mut errors = FieldErrors::default();
        errors.set(Field::CustomerPhone, Some(ValidationError::PhoneInvalid));
        let err = AppError::Checkout(CheckoutError::Invalid(errors));
        assert!(!err.is_unexpected());
        assert_eq!(
            err.user_message(),
            "customer_phone: Please enter a valid phone number"
        );
        assert!(err.capture().is_none());
    }
}
