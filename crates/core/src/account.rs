//! Accounts - the contended resource of the ledger.
//!
//! Every account belongs to a user and carries a denormalized
//! `current_balance` that must agree with the sum of its posted entries
//! at every commit point.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Lifecycle state of an account.
///
/// `Active` and `Frozen` toggle freely; `Closed` is terminal and requires
/// a zero balance to enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Frozen => "frozen",
            AccountStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "frozen" => Some(AccountStatus::Frozen),
            "closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Product type of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Savings,
    Checking,
    Wallet,
    Loan,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Checking => "checking",
            AccountType::Wallet => "wallet",
            AccountType::Loan => "loan",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "savings" => Some(AccountType::Savings),
            "checking" => Some(AccountType::Checking),
            "wallet" => Some(AccountType::Wallet),
            "loan" => Some(AccountType::Loan),
            _ => None,
        }
    }

    /// Loan accounts are the only ones allowed to hold a negative balance.
    pub fn can_overdraw(&self) -> bool {
        matches!(self, AccountType::Loan)
    }

    /// Two-letter prefix used in generated account numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            AccountType::Savings => "SB",
            AccountType::Checking => "CH",
            AccountType::Wallet => "WL",
            AccountType::Loan => "LN",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A bank account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Server-assigned id; also the canonical lock-ordering key
    pub account_id: i64,
    pub user_id: i64,
    /// Two-letter prefix + 8 decimal digits, unique
    pub account_number: String,
    pub account_type: AccountType,
    /// ISO-4217 code
    pub currency: String,
    pub current_balance: Decimal,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Whether a debit of `amount` would be rejected on this account.
    pub fn would_overdraw(&self, amount: Decimal) -> bool {
        !self.account_type.can_overdraw() && self.current_balance < amount
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}, {} {})",
            self.account_number, self.account_type, self.status, self.current_balance, self.currency
        )
    }
}

/// Check that an account number has the generated shape: two ASCII
/// uppercase letters followed by exactly eight decimal digits.
pub fn validate_account_number(number: &str) -> CoreResult<()> {
    let bytes = number.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit);
    if well_formed {
        Ok(())
    } else {
        Err(CoreError::InvalidAccountNumber(number.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_account(account_type: AccountType, balance: Decimal) -> Account {
        Account {
            account_id: 1,
            user_id: 1,
            account_number: "SB00000001".to_string(),
            account_type,
            currency: "USD".to_string(),
            current_balance: balance,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Frozen,
            AccountStatus::Closed,
        ] {
            assert_eq!(AccountStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AccountStatus::parse("dormant"), None);
    }

    #[test]
    fn test_account_type_overdraw() {
        assert!(AccountType::Loan.can_overdraw());
        assert!(!AccountType::Savings.can_overdraw());
        assert!(!AccountType::Checking.can_overdraw());
        assert!(!AccountType::Wallet.can_overdraw());
    }

    #[test]
    fn test_would_overdraw() {
        let savings = sample_account(AccountType::Savings, dec!(100));
        assert!(savings.would_overdraw(dec!(100.0001)));
        assert!(!savings.would_overdraw(dec!(100)));

        let loan = sample_account(AccountType::Loan, dec!(0));
        assert!(!loan.would_overdraw(dec!(5000)));
    }

    #[test]
    fn test_number_prefixes() {
        assert_eq!(AccountType::Savings.number_prefix(), "SB");
        assert_eq!(AccountType::Checking.number_prefix(), "CH");
        assert_eq!(AccountType::Wallet.number_prefix(), "WL");
        assert_eq!(AccountType::Loan.number_prefix(), "LN");
    }

    #[test]
    fn test_validate_account_number() {
        assert!(validate_account_number("SB12345678").is_ok());
        assert!(validate_account_number("LN00000000").is_ok());
        assert!(validate_account_number("sb12345678").is_err());
        assert!(validate_account_number("SB1234567").is_err());
        assert!(validate_account_number("SB123456789").is_err());
        assert!(validate_account_number("S912345678").is_err());
    }
}
