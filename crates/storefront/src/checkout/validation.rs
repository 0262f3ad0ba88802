//! Field-scoped validation of checkout input.
//!
//! Validation failures are data attached to a field, not errors: they block
//! submission and are shown next to the offending input.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use coffee_house_core::{Email, Phone, PhoneError};
use regex::Regex;
use serde::Serialize;

/// Regex grouping the first ten digits of a phone number.
static PHONE_GROUPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3})(\d{3})(\d{4})").expect("Invalid regex"));

/// A validated checkout input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    DeliveryAddress,
}

impl Field {
    /// All validated fields, in form order.
    pub const ALL: [Self; 4] = [
        Self::CustomerName,
        Self::CustomerPhone,
        Self::CustomerEmail,
        Self::DeliveryAddress,
    ];

    /// Form field name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerName => "customer_name",
            Self::CustomerPhone => "customer_phone",
            Self::CustomerEmail => "customer_email",
            Self::DeliveryAddress => "delivery_address",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Name is required")]
    NameRequired,
    #[error("Phone number is required")]
    PhoneRequired,
    #[error("Please enter a valid phone number")]
    PhoneInvalid,
    #[error("Please enter a valid email address")]
    EmailInvalid,
    #[error("Delivery address is required")]
    AddressRequired,
}

/// Validation failures keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, ValidationError>);

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The failure for `field`, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<ValidationError> {
        self.0.get(&field).copied()
    }

    /// Iterate failures in form order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, ValidationError)> + '_ {
        self.0.iter().map(|(field, error)| (*field, *error))
    }

    pub(crate) fn set(&mut self, field: Field, error: Option<ValidationError>) {
        match error {
            Some(error) => {
                self.0.insert(field, error);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }

    pub(crate) fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, error)| format!("{field}: {error}"))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Name must be non-empty after trimming.
#[must_use]
pub fn check_name(name: &str) -> Option<ValidationError> {
    name.trim().is_empty().then_some(ValidationError::NameRequired)
}

/// Phone must be present and contain at least ten digits.
#[must_use]
pub fn check_phone(phone: &str) -> Option<ValidationError> {
    match Phone::parse(phone) {
        Ok(_) => None,
        Err(PhoneError::Empty) => Some(ValidationError::PhoneRequired),
        Err(PhoneError::TooFewDigits { .. }) => Some(ValidationError::PhoneInvalid),
    }
}

/// Email is optional; when present it must look like `local@domain.tld`.
#[must_use]
pub fn check_email(email: &str) -> Option<ValidationError> {
    if email.is_empty() {
        return None;
    }
    Email::parse(email)
        .is_err()
        .then_some(ValidationError::EmailInvalid)
}

/// Address must be non-empty after trimming.
#[must_use]
pub fn check_address(address: &str) -> Option<ValidationError> {
    address
        .trim()
        .is_empty()
        .then_some(ValidationError::AddressRequired)
}

/// Reformat phone input as the customer types: keep digits only and group
/// the first ten as `(123) 456-7890`.
#[must_use]
pub fn format_phone_input(input: &str) -> String {
    let digits: String = input.chars().filter(char::is_ascii_digit).collect();
    PHONE_GROUPS_RE
        .replace(&digits, "($1) $2-$3")
        .into_owned()
}
