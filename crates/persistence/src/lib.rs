//! # CoreBank Persistence
//!
//! SQLite store for the CoreBank ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Database                              │
//! │  ┌──────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │   schema     │   │    repos     │   │    triggers    │  │
//! │  │ (DDL, seed)  │   │ (per table)  │   │ (2nd defense)  │  │
//! │  └──────────────┘   └──────────────┘   └────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store is the sole source of truth: no balance is ever cached in
//! process. Each ledger operation runs as one `BEGIN IMMEDIATE`
//! transaction on its own connection; WAL mode keeps readers unblocked
//! while a writer holds the lock.

pub mod error;
pub mod sqlite;

pub use error::{PersistenceError, PersistenceResult};
pub use sqlite::repos::{
    clamp_limit, AccountRepo, AuditLogRepo, EmployeeRepo, EntryRepo, NewRiskScore, RiskScoreRepo,
    TransactionRepo, TransactionTypeRepo, UserRepo,
};
pub use sqlite::schema::{parse_decimal, parse_timestamp};
pub use sqlite::initialize;

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a connection waits on the writer lock before the store
/// reports a retryable conflict.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a CoreBank database file.
///
/// Cheap to clone; every [`Database::connect`] call opens a fresh
/// configured connection, so each ledger operation (and each thread) gets
/// its own.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open (creating if missing) the database at `path` and apply the
    /// schema.
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open with an explicit busy timeout (how long a writer waits for the
    /// lock before surfacing a conflict).
    pub fn open_with_busy_timeout(
        path: impl AsRef<Path>,
        busy_timeout: Duration,
    ) -> PersistenceResult<Self> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
            busy_timeout,
        };
        let conn = db.connect()?;
        initialize(&conn)?;
        Ok(db)
    }

    /// Open a configured connection: foreign keys on, busy timeout set.
    pub fn connect(&self) -> PersistenceResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
