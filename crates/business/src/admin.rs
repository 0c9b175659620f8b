//! Admin operations - privileged, employee-authenticated.
//!
//! Every mutating call verifies the employee principal inside the same
//! store transaction as the mutation and records the employee in the
//! audit row's `performed_by`.

use rusqlite::TransactionBehavior;
use tracing::info;

use corebank_core::{
    Account, AccountStatus, AccountType, AuditRecord, Employee, EntityKind, KycStatus,
    NewEmployee, Transaction, TransactionTypeCode, User,
};
use corebank_persistence::{
    AccountRepo, AuditLogRepo, Database, EmployeeRepo, TransactionRepo, UserRepo,
};

use crate::audit::AuditRecorder;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{
    close_account_in_tx, create_account_in_tx, get_user, toggle_freeze_in_tx, LedgerConfig,
};

/// Back-office service: KYC, user activation, account lifecycle on behalf
/// of users, and filtered listings.
#[derive(Debug, Clone)]
pub struct AdminService {
    db: Database,
    config: LedgerConfig,
}

impl AdminService {
    pub fn new(db: Database) -> Self {
        Self::with_config(db, LedgerConfig::default())
    }

    pub fn with_config(db: Database, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Load and check the acting employee: must exist and be active.
    fn authorize(
        &self,
        conn: &rusqlite::Connection,
        employee_id: &str,
        operation: &str,
    ) -> LedgerResult<Employee> {
        let employee = EmployeeRepo::get(conn, employee_id).map_err(|e| {
            if e.is_not_found() {
                LedgerError::EmployeeNotFound(employee_id.to_string())
            } else {
                e.into()
            }
        })?;
        if !employee.is_active {
            return Err(LedgerError::NotPermitted {
                principal: employee_id.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(employee)
    }

    /// Provision an employee. Bootstrap operation: the first employee has
    /// nobody to authorize it, so no principal is required.
    pub fn register_employee(&self, employee: &NewEmployee) -> LedgerResult<Employee> {
        let conn = self.db.connect()?;
        let created = EmployeeRepo::insert(&conn, employee).map_err(|e| {
            if e.is_unique_violation() {
                LedgerError::AlreadyExists(format!("employee {}", employee.employee_id))
            } else {
                e.into()
            }
        })?;
        info!(employee = %created.employee_id, "employee registered");
        Ok(created)
    }

    // ========================================================================
    // User management
    // ========================================================================

    /// Set a user's KYC status, auditing the transition.
    pub fn set_kyc_status(
        &self,
        employee_id: &str,
        user_id: i64,
        status: KycStatus,
    ) -> LedgerResult<User> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        self.authorize(&tx, employee_id, "set_kyc_status")?;

        let user = get_user(&tx, user_id)?;
        UserRepo::set_kyc_status(&tx, user_id, status)?;
        AuditRecorder::user_kyc_changed(&tx, user_id, user.kyc_status, status, Some(employee_id))?;
        let updated = get_user(&tx, user_id)?;
        tx.commit()?;

        info!(user = user_id, status = %status, by = employee_id, "kyc status updated");
        Ok(updated)
    }

    /// Activate or deactivate a user, auditing the transition.
    pub fn set_user_active(
        &self,
        employee_id: &str,
        user_id: i64,
        is_active: bool,
    ) -> LedgerResult<User> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        self.authorize(&tx, employee_id, "set_user_active")?;

        let user = get_user(&tx, user_id)?;
        UserRepo::set_active(&tx, user_id, is_active)?;
        AuditRecorder::user_active_changed(
            &tx,
            user_id,
            user.is_active,
            is_active,
            Some(employee_id),
        )?;
        let updated = get_user(&tx, user_id)?;
        tx.commit()?;

        info!(user = user_id, is_active, by = employee_id, "user active flag updated");
        Ok(updated)
    }

    // ========================================================================
    // Account management
    // ========================================================================

    /// Create an account on behalf of a user (same contract as the engine's
    /// `create_account`).
    pub fn create_account_for(
        &self,
        employee_id: &str,
        user_id: i64,
        account_type: AccountType,
        currency: &str,
    ) -> LedgerResult<Account> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        self.authorize(&tx, employee_id, "create_account_for")?;
        let account = create_account_in_tx(
            &tx,
            &self.config,
            user_id,
            account_type,
            currency,
            Some(employee_id),
        )?;
        tx.commit()?;
        info!(
            account = account.account_id,
            user = user_id,
            by = employee_id,
            "account created on behalf of user"
        );
        Ok(account)
    }

    /// Freeze or unfreeze any account.
    pub fn freeze_account(
        &self,
        employee_id: &str,
        account_id: i64,
    ) -> LedgerResult<AccountStatus> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        self.authorize(&tx, employee_id, "freeze_account")?;
        let status = toggle_freeze_in_tx(&tx, account_id, Some(employee_id))?;
        tx.commit()?;
        info!(account = account_id, status = %status, by = employee_id, "freeze toggled");
        Ok(status)
    }

    /// Close any account (zero-balance precondition applies).
    pub fn close_account(&self, employee_id: &str, account_id: i64) -> LedgerResult<()> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        self.authorize(&tx, employee_id, "close_account")?;
        close_account_in_tx(&tx, account_id, Some(employee_id))?;
        tx.commit()?;
        info!(account = account_id, by = employee_id, "account closed");
        Ok(())
    }

    // ========================================================================
    // Listings
    // ========================================================================

    pub fn list_users(
        &self,
        employee_id: &str,
        search: Option<&str>,
        kyc_status: Option<KycStatus>,
        limit: u32,
    ) -> LedgerResult<Vec<User>> {
        let conn = self.db.connect()?;
        self.authorize(&conn, employee_id, "list_users")?;
        Ok(UserRepo::list(&conn, search, kyc_status, limit)?)
    }

    pub fn list_accounts(
        &self,
        employee_id: &str,
        search: Option<&str>,
        status: Option<AccountStatus>,
        limit: u32,
    ) -> LedgerResult<Vec<Account>> {
        let conn = self.db.connect()?;
        self.authorize(&conn, employee_id, "list_accounts")?;
        Ok(AccountRepo::list(&conn, search, status, limit)?)
    }

    pub fn list_transactions(
        &self,
        employee_id: &str,
        search: Option<&str>,
        type_code: Option<TransactionTypeCode>,
        limit: u32,
    ) -> LedgerResult<Vec<Transaction>> {
        let conn = self.db.connect()?;
        self.authorize(&conn, employee_id, "list_transactions")?;
        Ok(TransactionRepo::list(&conn, search, type_code, limit)?)
    }

    pub fn audit_logs(
        &self,
        employee_id: &str,
        entity_type: Option<EntityKind>,
        limit: u32,
    ) -> LedgerResult<Vec<AuditRecord>> {
        let conn = self.db.connect()?;
        self.authorize(&conn, employee_id, "audit_logs")?;
        Ok(AuditLogRepo::list(&conn, entity_type, limit)?)
    }
}
