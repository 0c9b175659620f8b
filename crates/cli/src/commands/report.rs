//! Read-side commands: statements, history, integrity, balance sheet.

use anyhow::Result;
use std::path::Path;

use corebank_core::TransactionTypeCode;
use corebank_persistence::Database;
use corebank_reports::{self as reports, HistoryFilter, StatementLine};

fn print_lines(lines: &[StatementLine]) {
    if lines.is_empty() {
        println!("  (no entries)");
        return;
    }
    for line in lines {
        println!(
            "  {}  {:10}  {:>16}  bal {:>16}  {:9}  {}",
            line.transaction_date.format("%Y-%m-%d %H:%M:%S"),
            line.type_code,
            line.amount,
            line.balance_after,
            line.status,
            line.narrative,
        );
    }
}

pub fn statement(db_path: &Path, account_id: i64, limit: u32) -> Result<()> {
    let db = Database::open(db_path)?;
    let conn = db.connect()?;
    let lines = reports::mini_statement(&conn, account_id, limit)?;
    println!("📄 Statement for account {account_id}");
    print_lines(&lines);
    Ok(())
}

pub fn history(
    db_path: &Path,
    user_id: i64,
    type_code: Option<TransactionTypeCode>,
    limit: u32,
    offset: u32,
) -> Result<()> {
    let db = Database::open(db_path)?;
    let conn = db.connect()?;
    let lines = reports::history(
        &conn,
        user_id,
        &HistoryFilter {
            type_code,
            limit,
            offset,
            ..HistoryFilter::default()
        },
    )?;
    println!("📄 History for user {user_id}");
    print_lines(&lines);
    Ok(())
}

pub fn integrity(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let conn = db.connect()?;
    let breaks = reports::ledger_integrity(&conn)?;
    if breaks.is_empty() {
        println!("✅ Ledger integrity: all posted transfers sum to zero");
    } else {
        println!("❌ Ledger integrity violations:");
        for b in breaks {
            println!(
                "  txn {}  ref {}  net {}  ({} entries)",
                b.transaction_id, b.reference_id, b.net_sum, b.entry_count
            );
        }
    }
    Ok(())
}

pub fn balance_sheet(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let conn = db.connect()?;
    let sheet = reports::balance_sheet(&conn)?;
    println!("📊 Balance sheet");
    for line in sheet {
        println!(
            "  {}  {:>18}  ({} accounts)",
            line.currency, line.total_balance, line.account_count
        );
    }
    Ok(())
}
