//! Ledger engine errors and the error-kind taxonomy the API layer maps to
//! transport codes.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use corebank_core::{AccountStatus, CoreError, TransactionStatus};
use corebank_persistence::PersistenceError;

/// Errors from ledger, admin, and onboarding operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // === Input validation ===
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // === Missing entities ===
    #[error("account not found: {0}")]
    AccountNotFound(i64),

    #[error("user not found: {0}")]
    UserNotFound(i64),

    #[error("employee not found: {0}")]
    EmployeeNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(i64),

    // === Business preconditions ===
    #[error("cannot transfer between an account and itself: {0}")]
    SameAccount(i64),

    #[error("account {account_id} is not active (status: {status})")]
    AccountNotActive {
        account_id: i64,
        status: AccountStatus,
    },

    #[error("account {0} is closed")]
    AccountClosed(i64),

    #[error("account {0} is already closed")]
    AlreadyClosed(i64),

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("insufficient funds on account {account_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        account_id: i64,
        requested: Decimal,
        available: Decimal,
    },

    #[error("account {account_id} must have zero balance to close, current balance: {balance}")]
    NonZeroBalance { account_id: i64, balance: Decimal },

    #[error("user {0} is not active")]
    UserNotActive(i64),

    #[error("account limit reached for user {0}")]
    AccountLimitReached(i64),

    #[error("transaction {transaction_id} cannot be reversed from status {status}")]
    NotReversible {
        transaction_id: i64,
        status: TransactionStatus,
    },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    // === Privilege ===
    #[error("operation not permitted for {principal}: {operation}")]
    NotPermitted { principal: String, operation: String },

    // === Idempotency ===
    #[error("duplicate reference: {0}")]
    DuplicateReference(Uuid),

    // === Transport ===
    #[error("write conflict, retry: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("persistence error: {0}")]
    Persistence(PersistenceError),
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// The error kinds of the programmatic surface. The HTTP layer (out of
/// scope here) maps these onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Forbidden,
    Conflict,
    PreconditionFailed,
    Duplicate,
    Internal,
}

impl LedgerError {
    /// Classify this error into its transport kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount(_)
            | LedgerError::InvalidCurrency(_)
            | LedgerError::InvalidInput(_) => ErrorKind::InvalidInput,

            LedgerError::AccountNotFound(_)
            | LedgerError::UserNotFound(_)
            | LedgerError::EmployeeNotFound(_)
            | LedgerError::TransactionNotFound(_) => ErrorKind::NotFound,

            LedgerError::NotPermitted { .. } => ErrorKind::Forbidden,

            LedgerError::Conflict(_) => ErrorKind::Conflict,

            LedgerError::SameAccount(_)
            | LedgerError::AccountNotActive { .. }
            | LedgerError::AccountClosed(_)
            | LedgerError::AlreadyClosed(_)
            | LedgerError::CurrencyMismatch { .. }
            | LedgerError::InsufficientFunds { .. }
            | LedgerError::NonZeroBalance { .. }
            | LedgerError::UserNotActive(_)
            | LedgerError::AccountLimitReached(_)
            | LedgerError::NotReversible { .. }
            | LedgerError::AlreadyExists(_) => ErrorKind::PreconditionFailed,

            LedgerError::DuplicateReference(_) => ErrorKind::Duplicate,

            LedgerError::Internal(_) | LedgerError::Persistence(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller should retry with backoff.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, LedgerError::InsufficientFunds { .. })
    }
}

impl From<PersistenceError> for LedgerError {
    fn from(e: PersistenceError) -> Self {
        if e.is_busy() {
            LedgerError::Conflict(e.to_string())
        } else {
            LedgerError::Persistence(e)
        }
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::from(PersistenceError::from(e))
    }
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidAmount(msg) => LedgerError::InvalidAmount(msg),
            CoreError::InvalidCurrency(code) => LedgerError::InvalidCurrency(code),
            other => LedgerError::InvalidInput(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LedgerError::InvalidAmount("x".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(LedgerError::AccountNotFound(9).kind(), ErrorKind::NotFound);
        assert_eq!(
            LedgerError::InsufficientFunds {
                account_id: 1,
                requested: dec!(100),
                available: dec!(50),
            }
            .kind(),
            ErrorKind::PreconditionFailed
        );
        assert_eq!(
            LedgerError::DuplicateReference(Uuid::nil()).kind(),
            ErrorKind::Duplicate
        );
        assert_eq!(
            LedgerError::Conflict("busy".into()).kind(),
            ErrorKind::Conflict
        );
        assert!(LedgerError::Conflict("busy".into()).is_retryable());
        assert!(!LedgerError::SameAccount(1).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::InsufficientFunds {
            account_id: 7,
            requested: dec!(1000),
            available: dec!(700),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds on account 7: requested 1000, available 700"
        );
    }
}
