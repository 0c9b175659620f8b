//! Database initialization, status, and demo seed data.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;

use corebank_business::{Ledger, TransferRequest, UserService};
use corebank_core::{AccountType, NewUser};
use corebank_persistence::Database;

/// Initialize the database with schema
pub fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }
    Database::open(db_path).context("Failed to open database")?;
    Ok(())
}

/// Show database status
pub fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {db_path:?}");
        println!("   Run 'corebank init' to create the database");
        return Ok(());
    }

    let db = Database::open(db_path)?;
    let conn = db.connect()?;

    let count = |table: &str| -> Result<i64> {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .context("count query")
    };

    println!("📊 Database Status");
    println!("   Path: {db_path:?}");
    println!();
    println!("   Users:        {}", count("users")?);
    println!("   Employees:    {}", count("employees")?);
    println!("   Accounts:     {}", count("accounts")?);
    println!("   Transactions: {}", count("transactions")?);
    println!("   Entries:      {}", count("transaction_entries")?);
    println!("   Audit rows:   {}", count("audit_logs")?);

    Ok(())
}

/// Seed two demo customers with funded accounts and a transfer between
/// them.
pub fn seed_demo(db_path: &Path) -> Result<()> {
    println!("🌱 Seeding demo data...");

    let db = Database::open(db_path)?;
    let users = UserService::new(db.clone());
    let ledger = Ledger::new(db);

    let alice = users.register(&NewUser::new(
        "alice",
        "$argon2id$demo",
        "alice@corebank.test",
        "Alice Demo",
    ))?;
    let bob = users.register(&NewUser::new(
        "bob",
        "$argon2id$demo",
        "bob@corebank.test",
        "Bob Demo",
    ))?;

    let a = ledger.create_account(alice.user_id, AccountType::Savings, "USD")?;
    let b = ledger.create_account(bob.user_id, AccountType::Checking, "USD")?;

    ledger.deposit(a.account_id, Decimal::new(10_000_000, 4), "opening balance", None)?;
    ledger.deposit(b.account_id, Decimal::new(5_000_000, 4), "opening balance", None)?;
    ledger.transfer(TransferRequest {
        sender_account_id: a.account_id,
        receiver_account_id: b.account_id,
        amount: Decimal::new(2_000_000, 4),
        initiated_by: Some(alice.user_id),
        description: "seed transfer".to_string(),
        reference_id: None,
    })?;

    println!("   alice: account {} ({})", a.account_id, a.account_number);
    println!("   bob:   account {} ({})", b.account_id, b.account_number);
    println!("✅ Seed complete");
    Ok(())
}
