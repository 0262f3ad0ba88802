//! Interface language preference.

use serde::{Deserialize, Serialize};

/// Supported interface languages.
///
/// Khmer is the default for new visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Km,
}

impl Language {
    /// Two-letter language code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Km => "km",
        }
    }

    /// Parse a two-letter code, returning `None` for unsupported languages.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "km" => Some(Self::Km),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_khmer() {
        assert_eq!(Language::default(), Language::Km);
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("EN"), Some(Language::En));
        assert_eq!(Language::from_code("km"), Some(Language::Km));
        assert_eq!(Language::from_code("fr"), None);
    }
}
