//! Type-safe price representation using decimal arithmetic.
//!
//! Amounts are kept as exact [`Decimal`] values everywhere. Rounding to two
//! places happens only when a price is formatted for display, so repeated
//! recomputation never compounds rounding error.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD price.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Format for display (e.g., "$1,234.50", "-$3.00").
    ///
    /// Rounds half away from zero to two decimal places and groups the
    /// integer part by thousands.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };
        let text = format!("{:.2}", rounded.abs());
        let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        format!(
            "{sign}{}{}.{cents}",
            self.currency_code.symbol(),
            group_thousands(whole)
        )
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    KHR,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::KHR => "៛",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::KHR => "KHR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd(s: &str) -> String {
        Price::usd(s.parse().unwrap_or_default()).display()
    }

    #[test]
    fn test_display_rounds_only_at_format_time() {
        assert_eq!(usd("13.99"), "$13.99");
        assert_eq!(usd("1.005"), "$1.01");
        assert_eq!(usd("0"), "$0.00");
        assert_eq!(usd("4.5"), "$4.50");
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(usd("1234.5"), "$1,234.50");
        assert_eq!(usd("1000000"), "$1,000,000.00");
        assert_eq!(usd("999.999"), "$1,000.00");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(usd("-3"), "-$3.00");
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(CurrencyCode::default().code(), "USD");
        assert_eq!(CurrencyCode::KHR.symbol(), "៛");
    }
}
