//! The recognized language values.

use crate::core::OCRError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language selection for an extraction call.
///
/// Parsing is the validation boundary: any string outside the recognized
/// set fails with [`OCRError::InvalidLanguage`] before an engine is
/// touched, so engines can treat the value as total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Arabic script only.
    Arabic,
    /// French only.
    French,
    /// Mixed Arabic and French documents.
    Both,
}

impl FromStr for Language {
    type Err = OCRError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arabic" => Ok(Language::Arabic),
            "french" => Ok(Language::French),
            "both" => Ok(Language::Both),
            _ => Err(OCRError::invalid_language(s)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Arabic => write!(f, "Arabic"),
            Language::French => write!(f, "French"),
            Language::Both => write!(f, "Both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_recognized_set_case_insensitively() {
        assert_eq!("Arabic".parse::<Language>().unwrap(), Language::Arabic);
        assert_eq!("french".parse::<Language>().unwrap(), Language::French);
        assert_eq!("BOTH".parse::<Language>().unwrap(), Language::Both);
    }

    #[test]
    fn rejects_unknown_values_with_the_offending_value() {
        let err = "Spanish".parse::<Language>().unwrap_err();
        assert!(matches!(err, OCRError::InvalidLanguage { ref value } if value == "Spanish"));
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for language in [Language::Arabic, Language::French, Language::Both] {
            assert_eq!(language.to_string().parse::<Language>().unwrap(), language);
        }
    }
}
