//! Status enums for checkout and payment.

use serde::{Deserialize, Serialize};

/// Payment method chosen at checkout.
///
/// Only [`PaymentMethod::Khqr`] engages the QR payment session. The other
/// methods are labels on the order; no gateway integration exists for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cash,
    /// KHQR (Cambodian QR) with external verification.
    Khqr,
    Card,
    Paypal,
    ApplePay,
    GooglePay,
}

impl PaymentMethod {
    /// All recognized payment methods, in display order.
    pub const ALL: [Self; 6] = [
        Self::Cash,
        Self::Khqr,
        Self::Card,
        Self::Paypal,
        Self::ApplePay,
        Self::GooglePay,
    ];

    /// Whether the order may only be created after an external payment
    /// confirmation.
    #[must_use]
    pub const fn requires_external_confirmation(&self) -> bool {
        matches!(self, Self::Khqr)
    }

    /// Wire name of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Khqr => "khqr",
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::ApplePay => "apple_pay",
            Self::GooglePay => "google_pay",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Cash on Delivery",
            Self::Khqr => "KHQR (Cambodian QR)",
            Self::Card => "Credit/Debit Card",
            Self::Paypal => "PayPal",
            Self::ApplePay => "Apple Pay",
            Self::GooglePay => "Google Pay",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| format!("invalid payment method: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_khqr_requires_confirmation() {
        for method in PaymentMethod::ALL {
            assert_eq!(
                method.requires_external_confirmation(),
                method == PaymentMethod::Khqr
            );
        }
    }

    #[test]
    fn test_wire_names_match_serde() {
        for method in PaymentMethod::ALL {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{}\"", method.as_str()));
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(PaymentMethod::Cash.label(), "Cash on Delivery");
        assert_eq!(PaymentMethod::Khqr.label(), "KHQR (Cambodian QR)");
        let labels: std::collections::HashSet<_> =
            PaymentMethod::ALL.iter().map(PaymentMethod::label).collect();
        assert_eq!(labels.len(), PaymentMethod::ALL.len());
    }

    #[test]
    fn test_unknown_method() {
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }
}
