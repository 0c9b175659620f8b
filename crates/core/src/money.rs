//! Monetary amount and currency validation.
//!
//! Amounts and balances use `rust_decimal::Decimal` with a fixed scale of
//! four fractional digits. Validation happens once at the engine boundary;
//! everything past it may assume well-formed values.

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};

/// Maximum number of fractional digits carried by any amount or balance.
pub const AMOUNT_SCALE: u32 = 4;

/// Currency applied when an account is created without one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Validate an operation amount: strictly positive, at most
/// [`AMOUNT_SCALE`] fractional digits.
pub fn validate_amount(amount: Decimal) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(CoreError::InvalidAmount(format!(
            "amount {amount} has more than {AMOUNT_SCALE} fractional digits"
        )));
    }
    Ok(())
}

/// Validate and normalize an ISO-4217 currency code.
///
/// Returns the upper-cased code. An empty code falls back to
/// [`DEFAULT_CURRENCY`].
pub fn validate_currency(code: &str) -> CoreResult<String> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(DEFAULT_CURRENCY.to_string());
    }
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CoreError::InvalidCurrency(code.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_amount_positive() {
        assert!(validate_amount(dec!(0.0001)).is_ok());
        assert!(validate_amount(dec!(1000)).is_ok());
        assert!(validate_amount(dec!(42.5)).is_ok());
    }

    #[test]
    fn test_validate_amount_rejects_non_positive() {
        assert!(validate_amount(dec!(0)).is_err());
        assert!(validate_amount(dec!(-1)).is_err());
    }

    #[test]
    fn test_validate_amount_rejects_excess_scale() {
        assert!(validate_amount(dec!(0.00001)).is_err());
        assert!(validate_amount(dec!(1.123456)).is_err());
        // Trailing zeros beyond scale 4 are fine once normalized
        assert!(validate_amount(dec!(1.50000)).is_ok());
    }

    #[test]
    fn test_validate_currency() {
        assert_eq!(validate_currency("usd").unwrap(), "USD");
        assert_eq!(validate_currency("INR").unwrap(), "INR");
        assert_eq!(validate_currency("").unwrap(), DEFAULT_CURRENCY);
        assert_eq!(validate_currency("  ").unwrap(), DEFAULT_CURRENCY);
        assert!(validate_currency("DOLLARS").is_err());
        assert!(validate_currency("U1").is_err());
    }
}
