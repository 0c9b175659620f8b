//! Transactions - headers, entries, and the double-entry register.
//!
//! A header groups one or more entries under a single reference. Every
//! entry is one signed leg against exactly one account; for transfers the
//! legs sum to zero exactly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Seeded transaction type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionTypeCode {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Interest,
    Fee,
}

impl TransactionTypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionTypeCode::Deposit => "DEPOSIT",
            TransactionTypeCode::Withdrawal => "WITHDRAWAL",
            TransactionTypeCode::Transfer => "TRANSFER",
            TransactionTypeCode::Payment => "PAYMENT",
            TransactionTypeCode::Interest => "INTEREST",
            TransactionTypeCode::Fee => "FEE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEPOSIT" => Some(TransactionTypeCode::Deposit),
            "WITHDRAWAL" => Some(TransactionTypeCode::Withdrawal),
            "TRANSFER" => Some(TransactionTypeCode::Transfer),
            "PAYMENT" => Some(TransactionTypeCode::Payment),
            "INTEREST" => Some(TransactionTypeCode::Interest),
            "FEE" => Some(TransactionTypeCode::Fee),
            _ => None,
        }
    }

    /// INTEREST and FEE postings originate from the system, not a user.
    pub fn is_system_generated(&self) -> bool {
        matches!(
            self,
            TransactionTypeCode::Interest | TransactionTypeCode::Fee
        )
    }
}

impl fmt::Display for TransactionTypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the seeded `transaction_types` reference table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionType {
    pub type_id: i64,
    pub code: TransactionTypeCode,
    pub description: String,
    pub is_system_generated: bool,
}

/// Lifecycle state of a transaction header.
///
/// `Completed` and `Failed` are terminal; a completed transaction may only
/// be superseded by a compensating reversal, never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Reversed => "reversed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "reversed" => Some(TransactionStatus::Reversed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Reversed
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: i64,
    /// Idempotency key; unique across all headers
    pub reference_id: Uuid,
    pub type_code: TransactionTypeCode,
    pub description: String,
    /// None for system-generated postings
    pub initiated_by_user_id: Option<i64>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Side of an entry, derived from the sign of its amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySide::Debit => "debit",
            EntrySide::Credit => "credit",
        }
    }
}

impl fmt::Display for EntrySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One leg of a transaction against a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: i64,
    pub transaction_id: i64,
    pub account_id: i64,
    /// Signed amount: negative = debit, positive = credit
    pub amount: Decimal,
    /// Account balance immediately after this leg, in commit order
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Derived side; only the signed amount is stored.
    pub fn side(&self) -> EntrySide {
        if self.amount < Decimal::ZERO {
            EntrySide::Debit
        } else {
            EntrySide::Credit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_type_code_roundtrip() {
        for code in [
            TransactionTypeCode::Deposit,
            TransactionTypeCode::Withdrawal,
            TransactionTypeCode::Transfer,
            TransactionTypeCode::Payment,
            TransactionTypeCode::Interest,
            TransactionTypeCode::Fee,
        ] {
            assert_eq!(TransactionTypeCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(TransactionTypeCode::parse("REFUND"), None);
    }

    #[test]
    fn test_system_generated_types() {
        assert!(TransactionTypeCode::Interest.is_system_generated());
        assert!(TransactionTypeCode::Fee.is_system_generated());
        assert!(!TransactionTypeCode::Transfer.is_system_generated());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Reversed.is_terminal());
    }

    #[test]
    fn test_entry_side_derivation() {
        let entry = Entry {
            entry_id: 1,
            transaction_id: 1,
            account_id: 1,
            amount: dec!(-200),
            balance_after: dec!(800),
            created_at: Utc::now(),
        };
        assert_eq!(entry.side(), EntrySide::Debit);

        let entry = Entry {
            amount: dec!(200),
            balance_after: dec!(700),
            ..entry
        };
        assert_eq!(entry.side(), EntrySide::Credit);
    }
}
