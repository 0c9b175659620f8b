//! # CoreBank Business
//!
//! The transactional core of CoreBank.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Business Layer                          │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌────────────┐  │
//! │  │  Ledger  │  │  Admin   │  │   User   │  │   Audit    │  │
//! │  │  engine  │  │ service  │  │ service  │  │  recorder  │  │
//! │  └────┬─────┘  └────┬─────┘  └────┬─────┘  └─────┬──────┘  │
//! │       └─────────────┴─────┬───────┴──────────────┘         │
//! │                     invariant guards                       │
//! │                           │                                 │
//! │                  one immediate store                        │
//! │                 transaction per operation                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutating operation validates against rows read inside its own
//! `BEGIN IMMEDIATE` transaction and either commits completely or leaves
//! no trace.

pub mod admin;
pub mod audit;
pub mod error;
pub mod guards;
pub mod ledger;
pub mod users;

// Re-export commonly used types
pub use admin::AdminService;
pub use audit::AuditRecorder;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::{Ledger, LedgerConfig, Receipt, TransferRequest};
pub use users::UserService;
