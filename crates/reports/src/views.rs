//! Aggregate views: balance sheet, ledger integrity, system overview, and
//! the risk-score join.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use corebank_core::{Transaction, Verdict};
use corebank_persistence::{
    clamp_limit, parse_decimal, parse_timestamp, PersistenceError, PersistenceResult,
    RiskScoreRepo,
};

/// Per-currency total of balances the institution owes to users.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheetLine {
    pub currency: String,
    pub account_count: i64,
    pub total_balance: Decimal,
}

/// Sum of `current_balance` over all accounts, grouped by currency.
/// Sums are exact decimals computed in Rust.
pub fn balance_sheet(conn: &Connection) -> PersistenceResult<Vec<BalanceSheetLine>> {
    let mut stmt = conn.prepare("SELECT currency, current_balance FROM accounts")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut totals: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    for row in rows {
        let (currency, balance) = row?;
        let balance = parse_decimal("current_balance", &balance)?;
        let slot = totals.entry(currency).or_insert((0, Decimal::ZERO));
        slot.0 += 1;
        slot.1 += balance;
    }

    Ok(totals
        .into_iter()
        .map(|(currency, (account_count, total_balance))| BalanceSheetLine {
            currency,
            account_count,
            total_balance,
        })
        .collect())
}

/// A transfer whose legs do not cancel out. A healthy ledger never
/// produces one.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityBreak {
    pub transaction_id: i64,
    pub reference_id: Uuid,
    pub net_sum: Decimal,
    pub entry_count: i64,
}

/// Standing assertion surface: for every posted TRANSFER, the exact sum of
/// its entries. Returns the transactions whose sum is not zero; expected
/// result is the empty set. Single-leg types (deposits, withdrawals) move
/// money across the cash boundary and are definitionally unbalanced, so
/// the check applies to transfers.
pub fn ledger_integrity(conn: &Connection) -> PersistenceResult<Vec<IntegrityBreak>> {
    let mut stmt = conn.prepare(
        "SELECT t.transaction_id, t.reference_id, te.amount \
         FROM transactions t \
         JOIN transaction_types tt ON t.type_id = tt.type_id \
         JOIN transaction_entries te ON te.transaction_id = t.transaction_id \
         WHERE tt.type_code = 'TRANSFER' AND t.status IN ('completed', 'reversed') \
         ORDER BY t.transaction_id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut sums: BTreeMap<i64, (String, Decimal, i64)> = BTreeMap::new();
    for row in rows {
        let (transaction_id, reference, amount) = row?;
        let amount = parse_decimal("amount", &amount)?;
        let slot = sums
            .entry(transaction_id)
            .or_insert((reference, Decimal::ZERO, 0));
        slot.1 += amount;
        slot.2 += 1;
    }

    let mut breaks = Vec::new();
    for (transaction_id, (reference, net_sum, entry_count)) in sums {
        if net_sum != Decimal::ZERO {
            let reference_id = Uuid::parse_str(&reference).map_err(|_| {
                PersistenceError::InvalidEnumValue {
                    field: "reference_id".to_string(),
                    value: reference,
                }
            })?;
            breaks.push(IntegrityBreak {
                transaction_id,
                reference_id,
                net_sum,
                entry_count,
            });
        }
    }
    Ok(breaks)
}

/// System-wide KPIs for the back-office dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SystemOverview {
    pub total_users: i64,
    pub active_users: i64,
    pub pending_kyc: i64,
    pub total_accounts: i64,
    pub frozen_accounts: i64,
    pub total_transactions: i64,
    pub recent_transactions_24h: i64,
    /// Sum of balances on active accounts, per currency
    pub system_balance: Vec<BalanceSheetLine>,
}

pub fn overview(conn: &Connection) -> PersistenceResult<SystemOverview> {
    let count = |sql: &str| -> PersistenceResult<i64> {
        Ok(conn.query_row(sql, [], |row| row.get(0))?)
    };

    let cutoff = (Utc::now() - Duration::days(1)).to_rfc3339();
    let recent: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE created_at >= ?1",
        [cutoff],
        |row| row.get(0),
    )?;

    let mut stmt =
        conn.prepare("SELECT currency, current_balance FROM accounts WHERE status = 'active'")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut totals: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    for row in rows {
        let (currency, balance) = row?;
        let balance = parse_decimal("current_balance", &balance)?;
        let slot = totals.entry(currency).or_insert((0, Decimal::ZERO));
        slot.0 += 1;
        slot.1 += balance;
    }

    Ok(SystemOverview {
        total_users: count("SELECT COUNT(*) FROM users")?,
        active_users: count("SELECT COUNT(*) FROM users WHERE is_active = 1")?,
        pending_kyc: count("SELECT COUNT(*) FROM users WHERE kyc_status = 'pending'")?,
        total_accounts: count("SELECT COUNT(*) FROM accounts")?,
        frozen_accounts: count("SELECT COUNT(*) FROM accounts WHERE status = 'frozen'")?,
        total_transactions: count("SELECT COUNT(*) FROM transactions")?,
        recent_transactions_24h: recent,
        system_balance: totals
            .into_iter()
            .map(|(currency, (account_count, total_balance))| BalanceSheetLine {
                currency,
                account_count,
                total_balance,
            })
            .collect(),
    })
}

/// A transaction joined with its non-SAFE risk score.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedTransaction {
    pub transaction_id: i64,
    pub reference_id: Uuid,
    pub description: String,
    pub risk_score: f64,
    pub verdict: Verdict,
    pub model_version: String,
    pub scored_at: DateTime<Utc>,
}

/// Transactions the anomaly worker flagged SUSPICIOUS or CRITICAL, highest
/// risk first.
pub fn flagged_transactions(
    conn: &Connection,
    limit: u32,
) -> PersistenceResult<Vec<FlaggedTransaction>> {
    let sql = format!(
        "SELECT t.transaction_id, t.reference_id, t.description, rs.risk_score, \
         rs.verdict, rs.model_version, rs.scored_at \
         FROM transaction_risk_scores rs \
         JOIN transactions t ON rs.transaction_id = t.transaction_id \
         WHERE rs.verdict <> 'SAFE' \
         ORDER BY rs.risk_score DESC LIMIT {}",
        clamp_limit(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, f64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut flagged = Vec::new();
    for row in rows {
        let (transaction_id, reference, description, risk_score, verdict, model_version, scored_at) =
            row?;
        flagged.push(FlaggedTransaction {
            transaction_id,
            reference_id: Uuid::parse_str(&reference).map_err(|_| {
                PersistenceError::InvalidEnumValue {
                    field: "reference_id".to_string(),
                    value: reference,
                }
            })?,
            description,
            risk_score,
            verdict: Verdict::parse(&verdict).ok_or_else(|| {
                PersistenceError::InvalidEnumValue {
                    field: "verdict".to_string(),
                    value: verdict.clone(),
                }
            })?,
            model_version,
            scored_at: parse_timestamp(&scored_at)?,
        });
    }
    Ok(flagged)
}

/// Completed transactions that the anomaly worker has not scored yet (its
/// poll surface).
pub fn unscored_transactions(
    conn: &Connection,
    limit: u32,
) -> PersistenceResult<Vec<Transaction>> {
    RiskScoreRepo::unscored_transactions(conn, limit)
}
