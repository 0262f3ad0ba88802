//! Order payloads and submission.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coffee_house_core::{OrderId, PaymentMethod, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::ApiError;
use crate::cart::{Cart, CartError, CartStore};
use crate::checkout::{CheckoutDetails, OrderNumber};
use crate::payment::{PaymentConfirmation, TransactionId};

/// Generic message when the backend gives no detail.
pub const ORDER_FAILED_MESSAGE: &str = "Failed to place order. Please try again.";

/// A cart line reference in an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of a guest order creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub customer_name: String,
    pub customer_phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    /// Sent as the `Idempotency-Key` header, not in the body.
    #[serde(skip)]
    pub order_number: OrderNumber,
}

impl OrderRequest {
    /// Build an order from the cart's line references and the checkout
    /// details. A payment confirmation overrides the payment method.
    #[must_use]
    pub fn new(
        cart: &Cart,
        details: &CheckoutDetails,
        order_number: OrderNumber,
        confirmation: Option<PaymentConfirmation>,
    ) -> Self {
        let items = cart
            .iter()
            .map(|line| OrderItem {
                product_id: line.id,
                quantity: line.quantity,
            })
            .collect();

        let mut request = Self {
            items,
            customer_name: details.customer_name.trim().to_string(),
            customer_phone: details.customer_phone.trim().to_string(),
            customer_email: non_empty(&details.customer_email),
            delivery_address: details.delivery_address.trim().to_string(),
            payment_method: details.payment_method,
            notes: non_empty(&details.notes),
            payment_status: None,
            transaction_id: None,
            order_number,
        };

        if let Some(confirmation) = confirmation {
            request.payment_method = confirmation.payment_method;
            request.payment_status = Some(confirmation.payment_status);
            request.transaction_id = Some(confirmation.transaction_id);
        }

        request
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The backend's answer to an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
}

/// A past order, as listed by customer lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<OrderSummaryItem>,
}

impl OrderSummary {
    /// Status for display, `Pending` when the backend sent none.
    #[must_use]
    pub fn status_label(&self) -> String {
        let status = self.status.as_deref().unwrap_or("pending");
        let mut chars = status.chars();
        chars.next().map_or_else(String::new, |first| {
            first.to_uppercase().chain(chars).collect()
        })
    }
}

/// A line of a past order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummaryItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
}

/// Backend operations for orders.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Create a guest order.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderReceipt, ApiError>;
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The backend rejected or never received the order.
    #[error("order submission failed: {0}")]
    Api(#[from] ApiError),

    /// The order was accepted but the cart could not be cleared.
    #[error("order {order_id} placed but the cart could not be cleared: {source}")]
    ClearCart {
        order_id: OrderId,
        #[source]
        source: CartError,
    },
}

impl OrderError {
    /// Message safe to show to the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e
                .detail()
                .map_or_else(|| ORDER_FAILED_MESSAGE.to_string(), str::to_owned),
            Self::ClearCart { order_id, .. } => {
                format!("Order #{order_id} was placed, but your cart could not be emptied.")
            }
        }
    }
}

/// Sends orders and empties the cart once the backend accepts them.
pub struct OrderSubmitter<'a> {
    gateway: &'a dyn OrderGateway,
}

impl<'a> OrderSubmitter<'a> {
    #[must_use]
    pub const fn new(gateway: &'a dyn OrderGateway) -> Self {
        Self { gateway }
    }

    /// Submit `order`. On success the cart is cleared; on failure it is
    /// left untouched so the customer can retry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend does not accept the order, or if the
    /// accepted order's cart cannot be cleared.
    #[instrument(
        skip(self, cart, order),
        fields(order_number = %order.order_number, payment_method = %order.payment_method)
    )]
    pub async fn submit(
        &self,
        cart: &mut CartStore,
        order: OrderRequest,
    ) -> Result<OrderReceipt, OrderError> {
        let receipt = match self.gateway.create_order(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "Order rejected");
                return Err(e.into());
            }
        };

        info!(order_id = %receipt.id, "Order placed");
        cart.clear().map_err(|source| OrderError::ClearCart {
            order_id: receipt.id,
            source,
        })?;
        Ok(receipt)
    }
}
