//! Customer statements: per-account and per-user entry projections.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::Serialize;

use corebank_core::{EntrySide, TransactionStatus, TransactionTypeCode};
use corebank_persistence::{clamp_limit, parse_decimal, parse_timestamp, PersistenceResult};

/// One line of a statement: entry joined with its header and account.
#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub entry_id: i64,
    pub transaction_id: i64,
    pub transaction_date: DateTime<Utc>,
    pub type_code: TransactionTypeCode,
    pub narrative: String,
    /// Signed amount: negative = debit, positive = credit
    pub amount: Decimal,
    pub side: EntrySide,
    pub balance_after: Decimal,
    pub status: TransactionStatus,
    pub account_number: String,
}

const STATEMENT_SELECT: &str = "SELECT te.entry_id, te.transaction_id, t.created_at, \
     tt.type_code, t.description, te.amount, te.balance_after, t.status, a.account_number \
     FROM transaction_entries te \
     JOIN transactions t ON te.transaction_id = t.transaction_id \
     JOIN transaction_types tt ON t.type_id = tt.type_id \
     JOIN accounts a ON te.account_id = a.account_id";

fn line_from_row(row: &Row<'_>) -> rusqlite::Result<RawLine> {
    Ok(RawLine {
        entry_id: row.get(0)?,
        transaction_id: row.get(1)?,
        created_at: row.get(2)?,
        type_code: row.get(3)?,
        description: row.get(4)?,
        amount: row.get(5)?,
        balance_after: row.get(6)?,
        status: row.get(7)?,
        account_number: row.get(8)?,
    })
}

struct RawLine {
    entry_id: i64,
    transaction_id: i64,
    created_at: String,
    type_code: String,
    description: String,
    amount: String,
    balance_after: String,
    status: String,
    account_number: String,
}

impl RawLine {
    fn into_line(self) -> PersistenceResult<StatementLine> {
        let amount = parse_decimal("amount", &self.amount)?;
        let side = if amount < Decimal::ZERO {
            EntrySide::Debit
        } else {
            EntrySide::Credit
        };
        Ok(StatementLine {
            entry_id: self.entry_id,
            transaction_id: self.transaction_id,
            transaction_date: parse_timestamp(&self.created_at)?,
            type_code: TransactionTypeCode::parse(&self.type_code).ok_or_else(|| {
                corebank_persistence::PersistenceError::InvalidEnumValue {
                    field: "type_code".to_string(),
                    value: self.type_code.clone(),
                }
            })?,
            narrative: self.description,
            amount,
            side,
            balance_after: parse_decimal("balance_after", &self.balance_after)?,
            status: TransactionStatus::parse(&self.status).ok_or_else(|| {
                corebank_persistence::PersistenceError::InvalidEnumValue {
                    field: "status".to_string(),
                    value: self.status.clone(),
                }
            })?,
            account_number: self.account_number,
        })
    }
}

/// Time-ordered statement across all of a user's accounts, newest first.
pub fn customer_statement(
    conn: &Connection,
    user_id: i64,
    limit: u32,
) -> PersistenceResult<Vec<StatementLine>> {
    let sql = format!(
        "{STATEMENT_SELECT} WHERE a.user_id = ?1 ORDER BY te.entry_id DESC LIMIT {}",
        clamp_limit(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([user_id], line_from_row)?;
    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?.into_line()?);
    }
    Ok(lines)
}

/// Last `n` entries of one account with running `balance_after`, newest
/// first (entry id is the commit order).
pub fn mini_statement(
    conn: &Connection,
    account_id: i64,
    n: u32,
) -> PersistenceResult<Vec<StatementLine>> {
    let sql = format!(
        "{STATEMENT_SELECT} WHERE te.account_id = ?1 ORDER BY te.entry_id DESC LIMIT {}",
        clamp_limit(n)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([account_id], line_from_row)?;
    let mut lines = Vec::new();
    for row in rows {
        lines.push(row?.into_line()?);
    }
    Ok(lines)
}

/// Filters for the paginated history view.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub type_code: Option<TransactionTypeCode>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Bounds on the magnitude of the entry amount
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Substring match against the header description
    pub description_contains: Option<String>,
    /// Page size, clamped to 500; 0 means the default of 50
    pub limit: u32,
    pub offset: u32,
}

impl HistoryFilter {
    fn effective_limit(&self) -> usize {
        if self.limit == 0 {
            50
        } else {
            clamp_limit(self.limit) as usize
        }
    }
}

/// Paginated entries across the user's accounts, newest first. Type, date
/// and text filters run in SQL; the amount-range filter compares exact
/// decimals in Rust, after which offset/limit paginate the filtered set.
pub fn history(
    conn: &Connection,
    user_id: i64,
    filter: &HistoryFilter,
) -> PersistenceResult<Vec<StatementLine>> {
    let mut sql = format!("{STATEMENT_SELECT} WHERE a.user_id = ?1");
    let mut values: Vec<String> = vec![user_id.to_string()];

    if let Some(code) = filter.type_code {
        sql.push_str(&format!(" AND tt.type_code = ?{}", values.len() + 1));
        values.push(code.as_str().to_string());
    }
    if let Some(from) = filter.from {
        sql.push_str(&format!(" AND t.created_at >= ?{}", values.len() + 1));
        values.push(from.to_rfc3339());
    }
    if let Some(to) = filter.to {
        sql.push_str(&format!(" AND t.created_at <= ?{}", values.len() + 1));
        values.push(to.to_rfc3339());
    }
    if let Some(ref text) = filter.description_contains {
        sql.push_str(&format!(" AND t.description LIKE ?{}", values.len() + 1));
        values.push(format!("%{text}%"));
    }
    sql.push_str(" ORDER BY te.entry_id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), line_from_row)?;

    let mut lines = Vec::new();
    for row in rows {
        let line = row?.into_line()?;
        let magnitude = line.amount.abs();
        if let Some(min) = filter.min_amount {
            if magnitude < min {
                continue;
            }
        }
        if let Some(max) = filter.max_amount {
            if magnitude > max {
                continue;
            }
        }
        lines.push(line);
    }

    Ok(lines
        .into_iter()
        .skip(filter.offset as usize)
        .take(filter.effective_limit())
        .collect())
}
