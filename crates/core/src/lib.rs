//! # CoreBank Core
//!
//! Domain types for the CoreBank ledger - users, employees, accounts,
//! transactions, audit records, and risk scores.
//!
//! All monetary values are `rust_decimal::Decimal` with at most
//! [`money::AMOUNT_SCALE`] fractional digits. There is no floating-point
//! money anywhere in the workspace.

pub mod account;
pub mod audit;
pub mod employee;
pub mod error;
pub mod money;
pub mod risk;
pub mod transaction;
pub mod user;

// Re-export commonly used types
pub use account::{Account, AccountStatus, AccountType};
pub use audit::{AuditAction, AuditRecord, EntityKind};
pub use employee::{Department, Employee, NewEmployee};
pub use error::{CoreError, CoreResult};
pub use money::{validate_amount, validate_currency, AMOUNT_SCALE, DEFAULT_CURRENCY};
pub use risk::{RiskScore, Verdict};
pub use transaction::{
    Entry, EntrySide, Transaction, TransactionStatus, TransactionType, TransactionTypeCode,
};
pub use user::{KycStatus, NewUser, User, UserRole};
