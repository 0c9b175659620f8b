//! Row types and column conversions for the SQLite tables.
//!
//! Rows carry raw column values (decimals and timestamps as TEXT); the
//! fallible conversion into domain types lives here so the repositories
//! stay thin.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use rust_decimal::Decimal;
use uuid::Uuid;

use corebank_core::{
    Account, AccountStatus, AccountType, AuditAction, AuditRecord, Department, Employee,
    EntityKind, Entry, KycStatus, RiskScore, Transaction, TransactionStatus, TransactionType,
    TransactionTypeCode, User, UserRole, Verdict,
};

use crate::error::{PersistenceError, PersistenceResult};

/// Parse a TEXT decimal column.
pub fn parse_decimal(column: &str, value: &str) -> PersistenceResult<Decimal> {
    value
        .parse::<Decimal>()
        .map_err(|_| PersistenceError::InvalidDecimal {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Parse an RFC 3339 TEXT timestamp column.
pub fn parse_timestamp(value: &str) -> PersistenceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| PersistenceError::InvalidTimestamp(value.to_string()))
}

fn parse_enum<T>(field: &str, value: &str, parse: impl Fn(&str) -> Option<T>) -> PersistenceResult<T> {
    parse(value).ok_or_else(|| PersistenceError::InvalidEnumValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Row of the `users` table
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub phone: Option<String>,
    pub full_name: String,
    pub date_of_birth: Option<String>,
    pub kyc_status: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub const COLUMNS: &'static str = "user_id, username, password_hash, email, phone, \
         full_name, date_of_birth, kyc_status, role, is_active, created_at, updated_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            full_name: row.get(5)?,
            date_of_birth: row.get(6)?,
            kyc_status: row.get(7)?,
            role: row.get(8)?,
            is_active: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = PersistenceError;

    fn try_from(row: UserRow) -> PersistenceResult<Self> {
        let date_of_birth = match row.date_of_birth {
            Some(s) => Some(
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|_| PersistenceError::InvalidTimestamp(s))?,
            ),
            None => None,
        };
        Ok(User {
            user_id: row.user_id,
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            phone: row.phone,
            full_name: row.full_name,
            date_of_birth,
            kyc_status: parse_enum("kyc_status", &row.kyc_status, KycStatus::parse)?,
            role: parse_enum("role", &row.role, UserRole::parse)?,
            is_active: row.is_active,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Row of the `employees` table
#[derive(Debug, Clone)]
pub struct EmployeeRow {
    pub employee_id: String,
    pub password_hash: String,
    pub full_name: String,
    pub email: String,
    pub department: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl EmployeeRow {
    pub const COLUMNS: &'static str =
        "employee_id, password_hash, full_name, email, department, is_active, created_at, updated_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            employee_id: row.get(0)?,
            password_hash: row.get(1)?,
            full_name: row.get(2)?,
            email: row.get(3)?,
            department: row.get(4)?,
            is_active: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = PersistenceError;

    fn try_from(row: EmployeeRow) -> PersistenceResult<Self> {
        Ok(Employee {
            employee_id: row.employee_id,
            password_hash: row.password_hash,
            full_name: row.full_name,
            email: row.email,
            department: parse_enum("department", &row.department, Department::parse)?,
            is_active: row.is_active,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Row of the `accounts` table
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub account_id: i64,
    pub user_id: i64,
    pub account_number: String,
    pub account_type: String,
    pub currency: String,
    pub current_balance: String,
    pub status: String,
    pub created_at: String,
}

impl AccountRow {
    pub const COLUMNS: &'static str =
        "account_id, user_id, account_number, account_type, currency, current_balance, status, created_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account_id: row.get(0)?,
            user_id: row.get(1)?,
            account_number: row.get(2)?,
            account_type: row.get(3)?,
            currency: row.get(4)?,
            current_balance: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;

    fn try_from(row: AccountRow) -> PersistenceResult<Self> {
        Ok(Account {
            account_id: row.account_id,
            user_id: row.user_id,
            account_number: row.account_number,
            account_type: parse_enum("account_type", &row.account_type, AccountType::parse)?,
            currency: row.currency,
            current_balance: parse_decimal("current_balance", &row.current_balance)?,
            status: parse_enum("status", &row.status, AccountStatus::parse)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Row of `transactions` joined with its type code
#[derive(Debug, Clone)]
pub struct TransactionRow {
    pub transaction_id: i64,
    pub reference_id: String,
    pub type_code: String,
    pub description: String,
    pub initiated_by_user_id: Option<i64>,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl TransactionRow {
    /// Select list for queries of the form
    /// `FROM transactions t JOIN transaction_types tt USING (type_id)`.
    pub const COLUMNS: &'static str = "t.transaction_id, t.reference_id, tt.type_code, \
         t.description, t.initiated_by_user_id, t.status, t.created_at, t.completed_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            transaction_id: row.get(0)?,
            reference_id: row.get(1)?,
            type_code: row.get(2)?,
            description: row.get(3)?,
            initiated_by_user_id: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            completed_at: row.get(7)?,
        })
    }
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = PersistenceError;

    fn try_from(row: TransactionRow) -> PersistenceResult<Self> {
        let reference_id = Uuid::parse_str(&row.reference_id).map_err(|_| {
            PersistenceError::InvalidEnumValue {
                field: "reference_id".to_string(),
                value: row.reference_id.clone(),
            }
        })?;
        let completed_at = match row.completed_at {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        };
        Ok(Transaction {
            transaction_id: row.transaction_id,
            reference_id,
            type_code: parse_enum("type_code", &row.type_code, TransactionTypeCode::parse)?,
            description: row.description,
            initiated_by_user_id: row.initiated_by_user_id,
            status: parse_enum("status", &row.status, TransactionStatus::parse)?,
            created_at: parse_timestamp(&row.created_at)?,
            completed_at,
        })
    }
}

/// Row of the `transaction_types` table
#[derive(Debug, Clone)]
pub struct TransactionTypeRow {
    pub type_id: i64,
    pub type_code: String,
    pub description: String,
    pub is_system_generated: bool,
}

impl TransactionTypeRow {
    pub const COLUMNS: &'static str = "type_id, type_code, description, is_system_generated";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            type_id: row.get(0)?,
            type_code: row.get(1)?,
            description: row.get(2)?,
            is_system_generated: row.get(3)?,
        })
    }
}

impl TryFrom<TransactionTypeRow> for TransactionType {
    type Error = PersistenceError;

    fn try_from(row: TransactionTypeRow) -> PersistenceResult<Self> {
        Ok(TransactionType {
            type_id: row.type_id,
            code: parse_enum("type_code", &row.type_code, TransactionTypeCode::parse)?,
            description: row.description,
            is_system_generated: row.is_system_generated,
        })
    }
}

/// Row of the `transaction_entries` table
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub entry_id: i64,
    pub transaction_id: i64,
    pub account_id: i64,
    pub amount: String,
    pub balance_after: String,
    pub created_at: String,
}

impl EntryRow {
    pub const COLUMNS: &'static str =
        "entry_id, transaction_id, account_id, amount, balance_after, created_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entry_id: row.get(0)?,
            transaction_id: row.get(1)?,
            account_id: row.get(2)?,
            amount: row.get(3)?,
            balance_after: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl TryFrom<EntryRow> for Entry {
    type Error = PersistenceError;

    fn try_from(row: EntryRow) -> PersistenceResult<Self> {
        Ok(Entry {
            entry_id: row.entry_id,
            transaction_id: row.transaction_id,
            account_id: row.account_id,
            amount: parse_decimal("amount", &row.amount)?,
            balance_after: parse_decimal("balance_after", &row.balance_after)?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Row of the `audit_logs` table
#[derive(Debug, Clone)]
pub struct AuditLogRow {
    pub log_id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub action_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub performed_by: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

impl AuditLogRow {
    pub const COLUMNS: &'static str = "log_id, entity_type, entity_id, action_type, old_value, \
         new_value, performed_by, ip_address, created_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            log_id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            action_type: row.get(3)?,
            old_value: row.get(4)?,
            new_value: row.get(5)?,
            performed_by: row.get(6)?,
            ip_address: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<AuditLogRow> for AuditRecord {
    type Error = PersistenceError;

    fn try_from(row: AuditLogRow) -> PersistenceResult<Self> {
        let old_value = row.old_value.as_deref().map(serde_json::from_str).transpose()?;
        let new_value = row.new_value.as_deref().map(serde_json::from_str).transpose()?;
        Ok(AuditRecord {
            log_id: row.log_id,
            entity_type: parse_enum("entity_type", &row.entity_type, EntityKind::parse)?,
            entity_id: row.entity_id,
            action: parse_enum("action_type", &row.action_type, AuditAction::parse)?,
            old_value,
            new_value,
            performed_by: row.performed_by,
            ip_address: row.ip_address,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

/// Row of the `transaction_risk_scores` table
#[derive(Debug, Clone)]
pub struct RiskScoreRow {
    pub score_id: i64,
    pub transaction_id: i64,
    pub risk_score: f64,
    pub verdict: String,
    pub features_used: String,
    pub model_version: String,
    pub scored_at: String,
}

impl RiskScoreRow {
    pub const COLUMNS: &'static str =
        "score_id, transaction_id, risk_score, verdict, features_used, model_version, scored_at";

    pub fn from_sql_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            score_id: row.get(0)?,
            transaction_id: row.get(1)?,
            risk_score: row.get(2)?,
            verdict: row.get(3)?,
            features_used: row.get(4)?,
            model_version: row.get(5)?,
            scored_at: row.get(6)?,
        })
    }
}

impl TryFrom<RiskScoreRow> for RiskScore {
    type Error = PersistenceError;

    fn try_from(row: RiskScoreRow) -> PersistenceResult<Self> {
        Ok(RiskScore {
            score_id: row.score_id,
            transaction_id: row.transaction_id,
            risk_score: row.risk_score,
            verdict: parse_enum("verdict", &row.verdict, Verdict::parse)?,
            features_used: serde_json::from_str(&row.features_used)?,
            model_version: row.model_version,
            scored_at: parse_timestamp(&row.scored_at)?,
        })
    }
}
