//! Repository implementations for the SQLite store.
//!
//! Every function takes a `&Connection` so it composes into whatever
//! transaction the caller is running; `rusqlite::Transaction` derefs to
//! `Connection`, which is how the engine keeps one store transaction per
//! ledger operation.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use corebank_core::{
    Account, AccountStatus, AccountType, AuditAction, AuditRecord, Employee, EntityKind, Entry,
    KycStatus, NewEmployee, NewUser, RiskScore, Transaction, TransactionStatus, TransactionType,
    TransactionTypeCode, User, Verdict,
};

use crate::error::{PersistenceError, PersistenceResult};
use crate::sqlite::schema::{
    AccountRow, AuditLogRow, EmployeeRow, EntryRow, RiskScoreRow, TransactionRow,
    TransactionTypeRow, UserRow,
};

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Clamp a caller-supplied page size into [1, 500].
pub fn clamp_limit(limit: u32) -> i64 {
    i64::from(limit.clamp(1, 500))
}

// ============================================================================
// User Repository
// ============================================================================

/// Repository for the `users` table
pub struct UserRepo;

impl UserRepo {
    pub fn insert(conn: &Connection, user: &NewUser) -> PersistenceResult<User> {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO users (username, password_hash, email, phone, full_name, \
             date_of_birth, role, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                user.username,
                user.password_hash,
                user.email,
                user.phone,
                user.full_name,
                user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
                user.role.as_str(),
                now,
            ],
        )?;
        Self::get(conn, conn.last_insert_rowid())
    }

    pub fn get(conn: &Connection, user_id: i64) -> PersistenceResult<User> {
        let sql = format!("SELECT {} FROM users WHERE user_id = ?1", UserRow::COLUMNS);
        conn.query_row(&sql, params![user_id], UserRow::from_sql_row)
            .optional()?
            .ok_or_else(|| PersistenceError::not_found("User", user_id))?
            .try_into()
    }

    pub fn find_by_username(conn: &Connection, username: &str) -> PersistenceResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = ?1", UserRow::COLUMNS);
        conn.query_row(&sql, params![username], UserRow::from_sql_row)
            .optional()?
            .map(User::try_from)
            .transpose()
    }

    pub fn set_kyc_status(
        conn: &Connection,
        user_id: i64,
        status: KycStatus,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE users SET kyc_status = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![status.as_str(), now_rfc3339(), user_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("User", user_id));
        }
        Ok(())
    }

    pub fn set_active(conn: &Connection, user_id: i64, is_active: bool) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE user_id = ?3",
            params![is_active, now_rfc3339(), user_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("User", user_id));
        }
        Ok(())
    }

    /// List users with optional substring search (username, full name,
    /// email) and KYC filter, newest first.
    pub fn list(
        conn: &Connection,
        search: Option<&str>,
        kyc_status: Option<KycStatus>,
        limit: u32,
    ) -> PersistenceResult<Vec<User>> {
        let mut sql = format!("SELECT {} FROM users", UserRow::COLUMNS);
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(search) = search {
            let n = values.len() + 1;
            conditions.push(format!(
                "(username LIKE ?{n} OR full_name LIKE ?{n} OR email LIKE ?{n})"
            ));
            values.push(format!("%{search}%"));
        }
        if let Some(kyc) = kyc_status {
            conditions.push(format!("kyc_status = ?{}", values.len() + 1));
            values.push(kyc.as_str().to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC, user_id DESC LIMIT {}",
            clamp_limit(limit)
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(values.iter()),
            UserRow::from_sql_row,
        )?;
        let mut users = Vec::new();
        for row in rows {
            users.push(User::try_from(row?)?);
        }
        Ok(users)
    }
}

// ============================================================================
// Employee Repository
// ============================================================================

/// Repository for the `employees` table
pub struct EmployeeRepo;

impl EmployeeRepo {
    pub fn insert(conn: &Connection, employee: &NewEmployee) -> PersistenceResult<Employee> {
        let now = now_rfc3339();
        conn.execute(
            "INSERT INTO employees (employee_id, password_hash, full_name, email, department, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                employee.employee_id,
                employee.password_hash,
                employee.full_name,
                employee.email,
                employee.department.as_str(),
                now,
            ],
        )?;
        Self::get(conn, &employee.employee_id)
    }

    pub fn get(conn: &Connection, employee_id: &str) -> PersistenceResult<Employee> {
        let sql = format!(
            "SELECT {} FROM employees WHERE employee_id = ?1",
            EmployeeRow::COLUMNS
        );
        conn.query_row(&sql, params![employee_id], EmployeeRow::from_sql_row)
            .optional()?
            .ok_or_else(|| PersistenceError::not_found("Employee", employee_id))?
            .try_into()
    }

    pub fn set_active(
        conn: &Connection,
        employee_id: &str,
        is_active: bool,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE employees SET is_active = ?1, updated_at = ?2 WHERE employee_id = ?3",
            params![is_active, now_rfc3339(), employee_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("Employee", employee_id));
        }
        Ok(())
    }
}

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the `accounts` table
pub struct AccountRepo;

impl AccountRepo {
    pub fn insert(
        conn: &Connection,
        user_id: i64,
        account_number: &str,
        account_type: AccountType,
        currency: &str,
    ) -> PersistenceResult<Account> {
        conn.execute(
            "INSERT INTO accounts (user_id, account_number, account_type, currency, \
             current_balance, created_at) VALUES (?1, ?2, ?3, ?4, '0', ?5)",
            params![
                user_id,
                account_number,
                account_type.as_str(),
                currency,
                now_rfc3339(),
            ],
        )?;
        Self::get(conn, conn.last_insert_rowid())
    }

    /// Read one account row. Inside a `BEGIN IMMEDIATE` transaction this is
    /// the locked read the engine bases every balance decision on; SQLite's
    /// writer lock plays the role of the row lock.
    pub fn get(conn: &Connection, account_id: i64) -> PersistenceResult<Account> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE account_id = ?1",
            AccountRow::COLUMNS
        );
        conn.query_row(&sql, params![account_id], AccountRow::from_sql_row)
            .optional()?
            .ok_or_else(|| PersistenceError::not_found("Account", account_id))?
            .try_into()
    }

    pub fn list_by_user(conn: &Connection, user_id: i64) -> PersistenceResult<Vec<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE user_id = ?1 ORDER BY account_id",
            AccountRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], AccountRow::from_sql_row)?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(Account::try_from(row?)?);
        }
        Ok(accounts)
    }

    /// Number of accounts the user holds that are not closed.
    pub fn count_open_for_user(conn: &Connection, user_id: i64) -> PersistenceResult<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE user_id = ?1 AND status <> 'closed'",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn update_balance(
        conn: &Connection,
        account_id: i64,
        balance: &Decimal,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE accounts SET current_balance = ?1 WHERE account_id = ?2",
            params![balance.to_string(), account_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("Account", account_id));
        }
        Ok(())
    }

    pub fn update_status(
        conn: &Connection,
        account_id: i64,
        status: AccountStatus,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE accounts SET status = ?1 WHERE account_id = ?2",
            params![status.as_str(), account_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("Account", account_id));
        }
        Ok(())
    }

    /// List accounts with optional substring search (account number) and
    /// status filter, newest first.
    pub fn list(
        conn: &Connection,
        search: Option<&str>,
        status: Option<AccountStatus>,
        limit: u32,
    ) -> PersistenceResult<Vec<Account>> {
        let mut sql = format!("SELECT {} FROM accounts", AccountRow::COLUMNS);
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(search) = search {
            conditions.push(format!("account_number LIKE ?{}", values.len() + 1));
            values.push(format!("%{search}%"));
        }
        if let Some(status) = status {
            conditions.push(format!("status = ?{}", values.len() + 1));
            values.push(status.as_str().to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC, account_id DESC LIMIT {}",
            clamp_limit(limit)
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(values.iter()),
            AccountRow::from_sql_row,
        )?;
        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(Account::try_from(row?)?);
        }
        Ok(accounts)
    }
}

// ============================================================================
// Transaction Type Repository
// ============================================================================

/// Repository for the seeded `transaction_types` table
pub struct TransactionTypeRepo;

impl TransactionTypeRepo {
    pub fn get_by_code(
        conn: &Connection,
        code: TransactionTypeCode,
    ) -> PersistenceResult<TransactionType> {
        let sql = format!(
            "SELECT {} FROM transaction_types WHERE type_code = ?1",
            TransactionTypeRow::COLUMNS
        );
        conn.query_row(&sql, params![code.as_str()], TransactionTypeRow::from_sql_row)
            .optional()?
            .ok_or_else(|| PersistenceError::not_found("TransactionType", code))?
            .try_into()
    }

    pub fn all(conn: &Connection) -> PersistenceResult<Vec<TransactionType>> {
        let sql = format!(
            "SELECT {} FROM transaction_types ORDER BY type_id",
            TransactionTypeRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], TransactionTypeRow::from_sql_row)?;
        let mut types = Vec::new();
        for row in rows {
            types.push(TransactionType::try_from(row?)?);
        }
        Ok(types)
    }
}

// ============================================================================
// Transaction Repository
// ============================================================================

const TRANSACTION_FROM: &str = "FROM transactions t JOIN transaction_types tt USING (type_id)";

/// Repository for the `transactions` table
pub struct TransactionRepo;

impl TransactionRepo {
    /// Insert a header in `pending` status and return its id.
    pub fn insert_pending(
        conn: &Connection,
        reference_id: &Uuid,
        type_id: i64,
        description: &str,
        initiated_by_user_id: Option<i64>,
    ) -> PersistenceResult<i64> {
        conn.execute(
            "INSERT INTO transactions (reference_id, type_id, description, \
             initiated_by_user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reference_id.to_string(),
                type_id,
                description,
                initiated_by_user_id,
                now_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(conn: &Connection, transaction_id: i64) -> PersistenceResult<Transaction> {
        let sql = format!(
            "SELECT {} {TRANSACTION_FROM} WHERE t.transaction_id = ?1",
            TransactionRow::COLUMNS
        );
        conn.query_row(&sql, params![transaction_id], TransactionRow::from_sql_row)
            .optional()?
            .ok_or_else(|| PersistenceError::not_found("Transaction", transaction_id))?
            .try_into()
    }

    /// Idempotency lookup.
    pub fn find_by_reference(
        conn: &Connection,
        reference_id: &Uuid,
    ) -> PersistenceResult<Option<Transaction>> {
        let sql = format!(
            "SELECT {} {TRANSACTION_FROM} WHERE t.reference_id = ?1",
            TransactionRow::COLUMNS
        );
        conn.query_row(
            &sql,
            params![reference_id.to_string()],
            TransactionRow::from_sql_row,
        )
        .optional()?
        .map(Transaction::try_from)
        .transpose()
    }

    /// Promote a pending header to `completed`, stamping `completed_at`.
    pub fn mark_completed(
        conn: &Connection,
        transaction_id: i64,
        completed_at: DateTime<Utc>,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE transactions SET status = 'completed', completed_at = ?1 \
             WHERE transaction_id = ?2",
            params![completed_at.to_rfc3339(), transaction_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("Transaction", transaction_id));
        }
        Ok(())
    }

    pub fn set_status(
        conn: &Connection,
        transaction_id: i64,
        status: TransactionStatus,
    ) -> PersistenceResult<()> {
        let changed = conn.execute(
            "UPDATE transactions SET status = ?1 WHERE transaction_id = ?2",
            params![status.as_str(), transaction_id],
        )?;
        if changed == 0 {
            return Err(PersistenceError::not_found("Transaction", transaction_id));
        }
        Ok(())
    }

    /// List headers with optional reference/description search and type
    /// filter, newest first.
    pub fn list(
        conn: &Connection,
        search: Option<&str>,
        type_code: Option<TransactionTypeCode>,
        limit: u32,
    ) -> PersistenceResult<Vec<Transaction>> {
        let mut sql = format!("SELECT {} {TRANSACTION_FROM}", TransactionRow::COLUMNS);
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(search) = search {
            let n = values.len() + 1;
            conditions.push(format!(
                "(t.reference_id LIKE ?{n} OR t.description LIKE ?{n})"
            ));
            values.push(format!("%{search}%"));
        }
        if let Some(code) = type_code {
            conditions.push(format!("tt.type_code = ?{}", values.len() + 1));
            values.push(code.as_str().to_string());
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(
            " ORDER BY t.created_at DESC, t.transaction_id DESC LIMIT {}",
            clamp_limit(limit)
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(values.iter()),
            TransactionRow::from_sql_row,
        )?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(Transaction::try_from(row?)?);
        }
        Ok(transactions)
    }
}

// ============================================================================
// Entry Repository
// ============================================================================

/// Repository for the `transaction_entries` table
pub struct EntryRepo;

impl EntryRepo {
    pub fn insert(
        conn: &Connection,
        transaction_id: i64,
        account_id: i64,
        amount: &Decimal,
        balance_after: &Decimal,
    ) -> PersistenceResult<i64> {
        conn.execute(
            "INSERT INTO transaction_entries (transaction_id, account_id, amount, \
             balance_after, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                transaction_id,
                account_id,
                amount.to_string(),
                balance_after.to_string(),
                now_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_by_transaction(
        conn: &Connection,
        transaction_id: i64,
    ) -> PersistenceResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM transaction_entries WHERE transaction_id = ?1 ORDER BY entry_id",
            EntryRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![transaction_id], EntryRow::from_sql_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(Entry::try_from(row?)?);
        }
        Ok(entries)
    }

    /// Last `limit` entries for an account in reverse commit order
    /// (`entry_id` is the commit order).
    pub fn list_recent_for_account(
        conn: &Connection,
        account_id: i64,
        limit: u32,
    ) -> PersistenceResult<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM transaction_entries WHERE account_id = ?1 \
             ORDER BY entry_id DESC LIMIT {}",
            EntryRow::COLUMNS,
            clamp_limit(limit)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![account_id], EntryRow::from_sql_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(Entry::try_from(row?)?);
        }
        Ok(entries)
    }

    /// Exact sum of all posted entries for an account. Posted means the
    /// header completed; a later reversal does not un-post the original
    /// legs, so `reversed` headers count too.
    pub fn sum_posted_for_account(
        conn: &Connection,
        account_id: i64,
    ) -> PersistenceResult<Decimal> {
        let mut stmt = conn.prepare(
            "SELECT te.amount FROM transaction_entries te \
             JOIN transactions t USING (transaction_id) \
             WHERE te.account_id = ?1 AND t.status IN ('completed', 'reversed')",
        )?;
        let rows = stmt.query_map(params![account_id], |row| row.get::<_, String>(0))?;
        let mut sum = Decimal::ZERO;
        for row in rows {
            let raw = row?;
            sum += super::schema::parse_decimal("amount", &raw)?;
        }
        Ok(sum)
    }
}

// ============================================================================
// Audit Log Repository
// ============================================================================

/// Repository for the append-only `audit_logs` table
pub struct AuditLogRepo;

impl AuditLogRepo {
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        conn: &Connection,
        entity_type: EntityKind,
        entity_id: &str,
        action: AuditAction,
        old_value: Option<&Value>,
        new_value: Option<&Value>,
        performed_by: Option<&str>,
        ip_address: Option<&str>,
    ) -> PersistenceResult<i64> {
        conn.execute(
            "INSERT INTO audit_logs (entity_type, entity_id, action_type, old_value, \
             new_value, performed_by, ip_address, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entity_type.as_str(),
                entity_id,
                action.as_str(),
                old_value.map(Value::to_string),
                new_value.map(Value::to_string),
                performed_by,
                ip_address,
                now_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list(
        conn: &Connection,
        entity_type: Option<EntityKind>,
        limit: u32,
    ) -> PersistenceResult<Vec<AuditRecord>> {
        let mut sql = format!("SELECT {} FROM audit_logs", AuditLogRow::COLUMNS);
        let mut values: Vec<String> = Vec::new();
        if let Some(kind) = entity_type {
            sql.push_str(" WHERE entity_type = ?1");
            values.push(kind.as_str().to_string());
        }
        sql.push_str(&format!(
            " ORDER BY log_id DESC LIMIT {}",
            clamp_limit(limit)
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(values.iter()),
            AuditLogRow::from_sql_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(AuditRecord::try_from(row?)?);
        }
        Ok(records)
    }

    pub fn list_for_entity(
        conn: &Connection,
        entity_type: EntityKind,
        entity_id: &str,
    ) -> PersistenceResult<Vec<AuditRecord>> {
        let sql = format!(
            "SELECT {} FROM audit_logs WHERE entity_type = ?1 AND entity_id = ?2 \
             ORDER BY log_id",
            AuditLogRow::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![entity_type.as_str(), entity_id],
            AuditLogRow::from_sql_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(AuditRecord::try_from(row?)?);
        }
        Ok(records)
    }
}

// ============================================================================
// Risk Score Repository
// ============================================================================

/// Input for one risk score row, as delivered by the anomaly worker.
#[derive(Debug, Clone)]
pub struct NewRiskScore {
    pub transaction_id: i64,
    pub risk_score: f64,
    pub verdict: Verdict,
    pub features_used: Value,
    pub model_version: String,
}

/// Repository for the `transaction_risk_scores` table
pub struct RiskScoreRepo;

impl RiskScoreRepo {
    pub fn insert(conn: &Connection, score: &NewRiskScore) -> PersistenceResult<i64> {
        conn.execute(
            "INSERT INTO transaction_risk_scores (transaction_id, risk_score, verdict, \
             features_used, model_version, scored_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                score.transaction_id,
                score.risk_score,
                score.verdict.as_str(),
                score.features_used.to_string(),
                score.model_version,
                now_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_by_transaction(
        conn: &Connection,
        transaction_id: i64,
    ) -> PersistenceResult<Option<RiskScore>> {
        let sql = format!(
            "SELECT {} FROM transaction_risk_scores WHERE transaction_id = ?1",
            RiskScoreRow::COLUMNS
        );
        conn.query_row(&sql, params![transaction_id], RiskScoreRow::from_sql_row)
            .optional()?
            .map(RiskScore::try_from)
            .transpose()
    }

    /// Completed transactions that have no score yet, oldest first. This is
    /// the poll surface of the external anomaly worker.
    pub fn unscored_transactions(
        conn: &Connection,
        limit: u32,
    ) -> PersistenceResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {} {TRANSACTION_FROM} \
             LEFT JOIN transaction_risk_scores rs USING (transaction_id) \
             WHERE rs.score_id IS NULL AND t.status = 'completed' \
             ORDER BY t.transaction_id LIMIT {}",
            TransactionRow::COLUMNS,
            clamp_limit(limit)
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], TransactionRow::from_sql_row)?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(Transaction::try_from(row?)?);
        }
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::initialize;
    use rust_decimal_macros::dec;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        initialize(&conn).expect("apply schema");
        conn
    }

    fn seed_user(conn: &Connection) -> User {
        UserRepo::insert(
            conn,
            &NewUser::new("alice", "$kdf$hash", "alice@example.com", "Alice Doe"),
        )
        .expect("insert user")
    }

    fn seed_account(conn: &Connection, user_id: i64) -> Account {
        AccountRepo::insert(conn, user_id, "SB12345678", AccountType::Savings, "USD")
            .expect("insert account")
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = test_conn();
        initialize(&conn).expect("second apply");
    }

    #[test]
    fn test_user_insert_and_get() {
        let conn = test_conn();
        let user = seed_user(&conn);

        assert_eq!(user.username, "alice");
        assert_eq!(user.kyc_status, KycStatus::Pending);
        assert!(user.is_active);

        let fetched = UserRepo::get(&conn, user.user_id).unwrap();
        assert_eq!(fetched.email, "alice@example.com");

        let by_name = UserRepo::find_by_username(&conn, "alice").unwrap();
        assert!(by_name.is_some());
        assert!(UserRepo::find_by_username(&conn, "bob").unwrap().is_none());
    }

    #[test]
    fn test_user_unique_username() {
        let conn = test_conn();
        seed_user(&conn);

        let err = UserRepo::insert(
            &conn,
            &NewUser::new("alice", "$kdf$hash2", "other@example.com", "Other Alice"),
        )
        .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_user_kyc_and_active_updates() {
        let conn = test_conn();
        let user = seed_user(&conn);

        UserRepo::set_kyc_status(&conn, user.user_id, KycStatus::Verified).unwrap();
        UserRepo::set_active(&conn, user.user_id, false).unwrap();

        let fetched = UserRepo::get(&conn, user.user_id).unwrap();
        assert_eq!(fetched.kyc_status, KycStatus::Verified);
        assert!(!fetched.is_active);

        let err = UserRepo::set_kyc_status(&conn, 999, KycStatus::Verified).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_account_insert_and_balance_update() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);

        assert_eq!(account.current_balance, Decimal::ZERO);
        assert_eq!(account.status, AccountStatus::Active);

        AccountRepo::update_balance(&conn, account.account_id, &dec!(1000.5)).unwrap();
        let fetched = AccountRepo::get(&conn, account.account_id).unwrap();
        assert_eq!(fetched.current_balance, dec!(1000.5));
    }

    #[test]
    fn test_negative_balance_trigger_blocks_non_loan() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);

        let err = AccountRepo::update_balance(&conn, account.account_id, &dec!(-1)).unwrap_err();
        assert!(err.to_string().contains("cannot go negative"));

        let loan =
            AccountRepo::insert(&conn, user.user_id, "LN00000001", AccountType::Loan, "USD")
                .unwrap();
        AccountRepo::update_balance(&conn, loan.account_id, &dec!(-5000)).unwrap();
    }

    #[test]
    fn test_closed_account_status_is_terminal() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);

        AccountRepo::update_status(&conn, account.account_id, AccountStatus::Closed).unwrap();
        let err =
            AccountRepo::update_status(&conn, account.account_id, AccountStatus::Active)
                .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn test_transaction_lifecycle_and_reference_lookup() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();
        let reference = Uuid::new_v4();

        let txn_id = TransactionRepo::insert_pending(
            &conn,
            &reference,
            deposit_type.type_id,
            "seed deposit",
            Some(user.user_id),
        )
        .unwrap();

        let pending = TransactionRepo::get(&conn, txn_id).unwrap();
        assert_eq!(pending.status, TransactionStatus::Pending);
        assert_eq!(pending.type_code, TransactionTypeCode::Deposit);

        TransactionRepo::mark_completed(&conn, txn_id, Utc::now()).unwrap();
        let completed = TransactionRepo::find_by_reference(&conn, &reference)
            .unwrap()
            .expect("find by reference");
        assert_eq!(completed.status, TransactionStatus::Completed);
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn test_terminal_transaction_trigger() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();
        let txn_id = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            Some(user.user_id),
        )
        .unwrap();
        TransactionRepo::mark_completed(&conn, txn_id, Utc::now()).unwrap();

        // completed -> pending is rejected by the store
        let err = TransactionRepo::set_status(&conn, txn_id, TransactionStatus::Pending)
            .unwrap_err();
        assert!(err.to_string().contains("terminal"));

        // completed -> reversed is the single allowed transition
        TransactionRepo::set_status(&conn, txn_id, TransactionStatus::Reversed).unwrap();
    }

    #[test]
    fn test_entries_reject_frozen_account() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();
        let txn_id = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            Some(user.user_id),
        )
        .unwrap();

        AccountRepo::update_status(&conn, account.account_id, AccountStatus::Frozen).unwrap();
        let err =
            EntryRepo::insert(&conn, txn_id, account.account_id, &dec!(100), &dec!(100))
                .unwrap_err();
        assert!(err.to_string().contains("frozen or closed"));
    }

    #[test]
    fn test_entries_are_immutable() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();
        let txn_id = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            Some(user.user_id),
        )
        .unwrap();
        let entry_id =
            EntryRepo::insert(&conn, txn_id, account.account_id, &dec!(100), &dec!(100)).unwrap();

        let err = conn
            .execute(
                "UPDATE transaction_entries SET amount = '999' WHERE entry_id = ?1",
                params![entry_id],
            )
            .unwrap_err();
        assert!(err.to_string().contains("immutable"));

        let err = conn
            .execute(
                "DELETE FROM transaction_entries WHERE entry_id = ?1",
                params![entry_id],
            )
            .unwrap_err();
        assert!(err.to_string().contains("immutable"));
    }

    #[test]
    fn test_audit_log_is_append_only() {
        let conn = test_conn();
        let log_id = AuditLogRepo::append(
            &conn,
            EntityKind::User,
            "1",
            AuditAction::Create,
            None,
            Some(&serde_json::json!({"username": "alice"})),
            None,
            None,
        )
        .unwrap();

        let err = conn
            .execute(
                "UPDATE audit_logs SET entity_id = '2' WHERE log_id = ?1",
                params![log_id],
            )
            .unwrap_err();
        assert!(err.to_string().contains("append-only"));

        let err = conn
            .execute("DELETE FROM audit_logs WHERE log_id = ?1", params![log_id])
            .unwrap_err();
        assert!(err.to_string().contains("append-only"));

        let records = AuditLogRepo::list_for_entity(&conn, EntityKind::User, "1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Create);
        assert_eq!(
            records[0].new_value.as_ref().unwrap()["username"],
            serde_json::json!("alice")
        );
    }

    #[test]
    fn test_risk_scores_and_unscored_poll() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();

        let first = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            Some(user.user_id),
        )
        .unwrap();
        TransactionRepo::mark_completed(&conn, first, Utc::now()).unwrap();

        let second = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            Some(user.user_id),
        )
        .unwrap();
        TransactionRepo::mark_completed(&conn, second, Utc::now()).unwrap();

        let unscored = RiskScoreRepo::unscored_transactions(&conn, 10).unwrap();
        assert_eq!(unscored.len(), 2);

        RiskScoreRepo::insert(
            &conn,
            &NewRiskScore {
                transaction_id: first,
                risk_score: 0.92,
                verdict: Verdict::Suspicious,
                features_used: serde_json::json!({"amount": 15000.0, "hour_of_day": 3}),
                model_version: "v1.0".to_string(),
            },
        )
        .unwrap();

        let unscored = RiskScoreRepo::unscored_transactions(&conn, 10).unwrap();
        assert_eq!(unscored.len(), 1);
        assert_eq!(unscored[0].transaction_id, second);

        let score = RiskScoreRepo::get_by_transaction(&conn, first)
            .unwrap()
            .expect("score present");
        assert_eq!(score.verdict, Verdict::Suspicious);

        // one score per transaction
        let err = RiskScoreRepo::insert(
            &conn,
            &NewRiskScore {
                transaction_id: first,
                risk_score: 0.1,
                verdict: Verdict::Safe,
                features_used: serde_json::json!({}),
                model_version: "v1.0".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn test_sum_posted_for_account() {
        let conn = test_conn();
        let user = seed_user(&conn);
        let account = seed_account(&conn, user.user_id);
        let deposit_type =
            TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Deposit).unwrap();

        // completed header counts
        let txn = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            None,
        )
        .unwrap();
        EntryRepo::insert(&conn, txn, account.account_id, &dec!(100.25), &dec!(100.25)).unwrap();
        TransactionRepo::mark_completed(&conn, txn, Utc::now()).unwrap();

        // pending header does not
        let pending = TransactionRepo::insert_pending(
            &conn,
            &Uuid::new_v4(),
            deposit_type.type_id,
            "",
            None,
        )
        .unwrap();
        EntryRepo::insert(&conn, pending, account.account_id, &dec!(50), &dec!(150.25)).unwrap();

        let sum = EntryRepo::sum_posted_for_account(&conn, account.account_id).unwrap();
        assert_eq!(sum, dec!(100.25));
    }
}
