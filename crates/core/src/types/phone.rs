//! Customer phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty or only whitespace.
    #[error("phone number cannot be empty")]
    Empty,
    /// Fewer than [`Phone::MIN_DIGITS`] digits remain after stripping.
    #[error("phone number must contain at least {min} digits (got {got})")]
    TooFewDigits {
        /// Minimum digit count.
        min: usize,
        /// Digits found.
        got: usize,
    },
}

/// A customer phone number as entered by the customer.
///
/// Punctuation is allowed (`(123) 456-7890`); only the digit count is
/// checked. The original text is kept so the backend receives what the
/// customer typed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits in a valid phone number.
    pub const MIN_DIGITS: usize = 10;

    /// Parse a `Phone` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or has fewer than ten digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PhoneError::Empty);
        }

        let got = trimmed.chars().filter(char::is_ascii_digit).count();
        if got < Self::MIN_DIGITS {
            return Err(PhoneError::TooFewDigits {
                min: Self::MIN_DIGITS,
                got,
            });
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the phone number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns only the digits of the phone number.
    #[must_use]
    pub fn digits(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_punctuation() {
        let phone = Phone::parse("(123) 456-7890").unwrap();
        assert_eq!(phone.digits(), "1234567890");
        assert_eq!(phone.as_str(), "(123) 456-7890");
    }

    #[test]
    fn test_parse_rejects_letters_only() {
        assert_eq!(
            Phone::parse("abc"),
            Err(PhoneError::TooFewDigits { min: 10, got: 0 })
        );
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert_eq!(Phone::parse("   "), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_nine_digits() {
        assert!(matches!(
            Phone::parse("123-456-789"),
            Err(PhoneError::TooFewDigits { got: 9, .. })
        ));
    }
}
