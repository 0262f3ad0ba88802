//! KHQR payment session.
//!
//! A payment session displays a QR payment request for a bounded window and
//! drives it to a verified outcome. It is split into:
//!
//! - [`PaymentSession`] - the pure state machine. Every UI concern (countdown,
//!   whether "I have paid" is enabled, the error banner) is a projection of it.
//! - [`PaymentFlow`] - the async driver that owns the timer, talks to the
//!   [`PaymentGateway`], and resolves to a single [`PaymentOutcome`].
//!
//! Verification is user-initiated: the backend exposes a pull-style confirm
//! endpoint, so the session trusts the customer's "I have paid" click to
//! start exactly one verification call at a time.

mod flow;
mod session;

use std::fmt;

use async_trait::async_trait;
use coffee_house_core::PaymentMethod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::checkout::OrderNumber;
use crate::sequence::next_stamp;

pub use flow::{PaymentCommand, PaymentControls, PaymentFlow, PaymentOutcome, PaymentSettings};
pub use session::{
    DEFAULT_WINDOW_SECS, EXPIRED_MESSAGE, PaymentSession, PaymentStatus, RefreshOutcome,
    TickOutcome, TransitionError,
};

/// Prefix identifying KHQR transaction references.
pub const KHQR_TRANSACTION_PREFIX: &str = "KHQR-";

/// Client-generated reference for one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Generate a fresh KHQR transaction reference, unique per attempt.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{KHQR_TRANSACTION_PREFIX}{}", next_stamp()))
    }

    /// Wrap an existing reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof of a verified payment, merged into the order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub payment_method: PaymentMethod,
    pub payment_status: bool,
    pub transaction_id: TransactionId,
}

impl PaymentConfirmation {
    /// Confirmation of a verified KHQR payment.
    #[must_use]
    pub const fn khqr(transaction_id: TransactionId) -> Self {
        Self {
            payment_method: PaymentMethod::Khqr,
            payment_status: true,
            transaction_id,
        }
    }
}

/// Merchant display details shown above the QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantInfo {
    pub merchant_name: String,
    pub merchant_city: String,
    pub country_code: String,
}

/// The QR payment request displayed to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// KHQR string or image reference to render.
    pub qr: String,
    /// Backend reference for the generated code, when one was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

/// What the customer is being asked to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub bill_number: OrderNumber,
}

/// Result of a verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Backend operations a payment session needs.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Merchant display details. Best-effort: callers treat failure as
    /// "omit the merchant block".
    async fn merchant_info(&self) -> Result<MerchantInfo, ApiError>;

    /// Obtain the QR payload for a payment request.
    async fn request_qr(&self, request: &PaymentRequest) -> Result<QrPayload, ApiError>;

    /// Ask the verification authority whether `transaction_id` was paid.
    async fn verify_payment(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<VerificationResult, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_unique_and_prefixed() {
        let a = TransactionId::generate();
        let b = TransactionId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with(KHQR_TRANSACTION_PREFIX));
        assert!(a.as_str().len() > KHQR_TRANSACTION_PREFIX.len());
    }

    #[test]
    fn test_khqr_confirmation_is_paid() {
        let confirmation = PaymentConfirmation::khqr(TransactionId::new("KHQR-1"));
        assert_eq!(confirmation.payment_method, PaymentMethod::Khqr);
        assert!(confirmation.payment_status);
    }
}
