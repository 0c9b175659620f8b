//! User onboarding.
//!
//! Registration is the only self-service user mutation the ledger owns;
//! password hashing and session plumbing live in the API layer outside
//! this workspace, so the hash crosses the boundary opaque.

use rusqlite::TransactionBehavior;
use tracing::info;

use corebank_core::{NewUser, User};
use corebank_persistence::{Database, UserRepo};

use crate::audit::AuditRecorder;
use crate::error::{LedgerError, LedgerResult};

/// Self-service user operations.
#[derive(Debug, Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a user. Starts pending KYC, active, role as given.
    pub fn register(&self, new_user: &NewUser) -> LedgerResult<User> {
        if new_user.username.trim().is_empty() {
            return Err(LedgerError::InvalidInput("username must not be empty".into()));
        }
        if new_user.email.trim().is_empty() {
            return Err(LedgerError::InvalidInput("email must not be empty".into()));
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let user = UserRepo::insert(&tx, new_user).map_err(|e| {
            if e.is_unique_violation() {
                LedgerError::AlreadyExists(format!("user {}", new_user.username))
            } else {
                e.into()
            }
        })?;
        AuditRecorder::user_created(&tx, &user, None)?;
        tx.commit()?;

        info!(user = user.user_id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn get(&self, user_id: i64) -> LedgerResult<User> {
        let conn = self.db.connect()?;
        crate::ledger::get_user(&conn, user_id)
    }

    pub fn find_by_username(&self, username: &str) -> LedgerResult<Option<User>> {
        let conn = self.db.connect()?;
        Ok(UserRepo::find_by_username(&conn, username)?)
    }
}
