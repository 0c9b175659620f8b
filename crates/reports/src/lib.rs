//! # CoreBank Reports
//!
//! Read-only projections over the ledger: balance sheet, integrity check,
//! statements, history, and the risk-score join.
//!
//! Every function takes a plain read connection and performs no mutation.
//! Under WAL these reads never block the writer; monetary sums are
//! computed in exact decimals in Rust, never in SQL floats.

pub mod statement;
pub mod views;

pub use statement::{customer_statement, history, mini_statement, HistoryFilter, StatementLine};
pub use views::{
    balance_sheet, flagged_transactions, ledger_integrity, overview, unscored_transactions,
    BalanceSheetLine, FlaggedTransaction, IntegrityBreak, SystemOverview,
};
