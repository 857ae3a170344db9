//! Error types for DDL grammar operations.

use thiserror::Error;

/// Errors raised while reading or validating DDL text and values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Text did not match the expected grammar at the current position
    #[error("parse error: expected {expected}, found {found:?}")]
    Parse {
        /// What the grammar expected at this position
        expected: String,
        /// The remaining input where matching failed
        found: String,
    },

    /// Value is outside an enum's declared domain
    #[error("invalid {domain} value: {value:?}")]
    InvalidEnumValue {
        /// Name of the enum domain (e.g. "warehouse size")
        domain: &'static str,
        /// The rejected raw value
        value: String,
    },

    /// Value has the wrong shape for a property
    #[error("invalid value for {property}: {message}")]
    InvalidValue {
        /// Property name
        property: String,
        /// What was wrong with the value
        message: String,
    },
}

impl Error {
    /// Build a parse error, keeping a short excerpt of the offending input.
    pub fn parse(expected: impl Into<String>, found: &str) -> Self {
        let found: String = found.chars().take(40).collect();
        Error::Parse {
            expected: expected.into(),
            found,
        }
    }

    /// Build an invalid value error for a property.
    pub fn invalid_value(property: &str, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            property: property.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for DDL operations.
pub type Result<T> = std::result::Result<T, Error>;
