//! Checkout: collect and validate customer details, then decide whether the
//! order goes straight to submission or waits on a KHQR payment.

mod validation;

use std::fmt;

use coffee_house_core::PaymentMethod;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::cart::Cart;
use crate::order::OrderRequest;
use crate::payment::{PaymentConfirmation, PaymentRequest};
use crate::sequence::next_stamp;
use crate::totals::{PricingPolicy, compute_totals};

pub use validation::{
    Field, FieldErrors, ValidationError, check_address, check_email, check_name, check_phone,
    format_phone_input,
};

/// Prefix of client-generated order numbers.
pub const ORDER_NUMBER_PREFIX: &str = "ORD-";

/// Order number generated once per checkout, stable across retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("{ORDER_NUMBER_PREFIX}{}", next_stamp()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer details as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_phone: String,
    /// Optional; empty means "not given".
    pub customer_email: String,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    /// Optional; empty means "none".
    pub notes: String,
}

/// What to do after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAction {
    /// Send the order now.
    PlaceOrder(OrderRequest),
    /// Run a payment session first, then call
    /// [`CheckoutSession::complete_payment`].
    AwaitPayment(PaymentRequest),
}

/// Why a checkout cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Invalid(FieldErrors),

    #[error("Your cart is empty")]
    EmptyCart,
}

/// One checkout attempt.
///
/// The session only reads the cart. Dropping it discards everything typed.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    details: CheckoutDetails,
    errors: FieldErrors,
    order_number: OrderNumber,
    pricing: PricingPolicy,
}

impl CheckoutSession {
    #[must_use]
    pub fn new(pricing: PricingPolicy) -> Self {
        Self {
            details: CheckoutDetails::default(),
            errors: FieldErrors::default(),
            order_number: OrderNumber::generate(),
            pricing,
        }
    }

    #[must_use]
    pub const fn details(&self) -> &CheckoutDetails {
        &self.details
    }

    /// Current field errors.
    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    #[must_use]
    pub const fn order_number(&self) -> &OrderNumber {
        &self.order_number
    }

    /// Update a field. Phone input is reformatted; the field's error is
    /// cleared until it is validated again.
    pub fn set_field(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::CustomerName => &mut self.details.customer_name,
            Field::CustomerPhone => &mut self.details.customer_phone,
            Field::CustomerEmail => &mut self.details.customer_email,
            Field::DeliveryAddress => &mut self.details.delivery_address,
        };
        *slot = if field == Field::CustomerPhone {
            format_phone_input(value)
        } else {
            value.to_string()
        };
        self.errors.clear(field);
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.details.payment_method = method;
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.details.notes = notes.to_string();
    }

    /// Re-check a single field, returning its error if any.
    pub fn validate_field(&mut self, field: Field) -> Option<ValidationError> {
        let error = check(&self.details, field);
        self.errors.set(field, error);
        error
    }

    /// Re-check every field. Returns `true` when all pass.
    pub fn validate(&mut self) -> bool {
        for field in Field::ALL {
            self.validate_field(field);
        }
        self.errors.is_empty()
    }

    /// Validate and decide the next step.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Invalid`] with the failing fields, or
    /// [`CheckoutError::EmptyCart`]. Nothing is sent in either case.
    pub fn submit(&mut self, cart: &Cart) -> Result<SubmitAction, CheckoutError> {
        self.ready(cart)?;

        if self.details.payment_method.requires_external_confirmation() {
            let totals = compute_totals(cart, &self.pricing);
            debug!(order_number = %self.order_number, total = %totals.total, "Awaiting payment");
            return Ok(SubmitAction::AwaitPayment(PaymentRequest {
                amount: totals.total,
                bill_number: self.order_number.clone(),
            }));
        }

        Ok(SubmitAction::PlaceOrder(self.order_request(cart, None)))
    }

    /// Build the order for a verified payment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit`]; the details are validated again.
    pub fn complete_payment(
        &mut self,
        cart: &Cart,
        confirmation: PaymentConfirmation,
    ) -> Result<OrderRequest, CheckoutError> {
        self.ready(cart)?;
        Ok(self.order_request(cart, Some(confirmation)))
    }

    fn ready(&mut self, cart: &Cart) -> Result<(), CheckoutError> {
        if !self.validate() {
            return Err(CheckoutError::Invalid(self.errors.clone()));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(())
    }

    fn order_request(
        &self,
        cart: &Cart,
        confirmation: Option<PaymentConfirmation>,
    ) -> OrderRequest {
        OrderRequest::new(
            cart,
            &self.details,
            self.order_number.clone(),
            confirmation,
        )
    }
}

fn check(details: &CheckoutDetails, field: Field) -> Option<ValidationError> {
    match field {
        Field::CustomerName => check_name(&details.customer_name),
        Field::CustomerPhone => check_phone(&details.customer_phone),
        Field::CustomerEmail => check_email(&details.customer_email),
        Field::DeliveryAddress => check_address(&details.delivery_address),
    }
}
