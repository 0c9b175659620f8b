//! Audit recorder - JSON snapshots of user and account state transitions.
//!
//! Rows are written through the same connection (and therefore the same
//! store transaction) as the mutation they describe: an audit row exists
//! iff its change committed. Transactions themselves are not duplicated
//! here; the transaction tables are their own audit record.

use rusqlite::Connection;
use serde_json::json;

use corebank_core::{Account, AccountStatus, AuditAction, EntityKind, KycStatus, User};
use corebank_persistence::{AuditLogRepo, PersistenceResult};

/// Writes immutable audit rows for entity lifecycle changes.
pub struct AuditRecorder;

impl AuditRecorder {
    /// CREATE row for a new user: username / email / role snapshot.
    pub fn user_created(
        conn: &Connection,
        user: &User,
        performed_by: Option<&str>,
    ) -> PersistenceResult<i64> {
        let snapshot = json!({
            "username": user.username,
            "email": user.email,
            "role": user.role.as_str(),
        });
        AuditLogRepo::append(
            conn,
            EntityKind::User,
            &user.user_id.to_string(),
            AuditAction::Create,
            None,
            Some(&snapshot),
            performed_by,
            None,
        )
    }

    /// STATUS_CHANGE row for a user's `is_active` flag.
    pub fn user_active_changed(
        conn: &Connection,
        user_id: i64,
        was_active: bool,
        is_active: bool,
        performed_by: Option<&str>,
    ) -> PersistenceResult<i64> {
        AuditLogRepo::append(
            conn,
            EntityKind::User,
            &user_id.to_string(),
            AuditAction::StatusChange,
            Some(&json!({ "is_active": was_active })),
            Some(&json!({ "is_active": is_active })),
            performed_by,
            None,
        )
    }

    /// STATUS_CHANGE row for a user's KYC status.
    pub fn user_kyc_changed(
        conn: &Connection,
        user_id: i64,
        old: KycStatus,
        new: KycStatus,
        performed_by: Option<&str>,
    ) -> PersistenceResult<i64> {
        AuditLogRepo::append(
            conn,
            EntityKind::User,
            &user_id.to_string(),
            AuditAction::StatusChange,
            Some(&json!({ "kyc_status": old.as_str() })),
            Some(&json!({ "kyc_status": new.as_str() })),
            performed_by,
            None,
        )
    }

    /// CREATE row for a new account: number / type / currency snapshot.
    pub fn account_created(
        conn: &Connection,
        account: &Account,
        performed_by: Option<&str>,
    ) -> PersistenceResult<i64> {
        let snapshot = json!({
            "account_number": account.account_number,
            "account_type": account.account_type.as_str(),
            "currency": account.currency,
        });
        AuditLogRepo::append(
            conn,
            EntityKind::Account,
            &account.account_id.to_string(),
            AuditAction::Create,
            None,
            Some(&snapshot),
            performed_by,
            None,
        )
    }

    /// STATUS_CHANGE row for an account status transition.
    pub fn account_status_changed(
        conn: &Connection,
        account_id: i64,
        old: AccountStatus,
        new: AccountStatus,
        performed_by: Option<&str>,
    ) -> PersistenceResult<i64> {
        AuditLogRepo::append(
            conn,
            EntityKind::Account,
            &account_id.to_string(),
            AuditAction::StatusChange,
            Some(&json!({ "status": old.as_str() })),
            Some(&json!({ "status": new.as_str() })),
            performed_by,
            None,
        )
    }
}
