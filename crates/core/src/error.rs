//! Core domain errors.

use thiserror::Error;

/// Errors raised while validating or constructing domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("invalid {field} value: {value}")]
    InvalidEnumValue { field: String, value: String },

    #[error("invalid account number: {0}")]
    InvalidAccountNumber(String),
}

/// Result type alias for domain validation.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an InvalidEnumValue error.
    pub fn invalid_enum(field: &str, value: &str) -> Self {
        Self::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}
