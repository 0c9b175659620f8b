//! Posting commands: deposit, withdraw, transfer, reverse.

use anyhow::Result;
use rust_decimal::Decimal;
use std::path::Path;
use uuid::Uuid;

use corebank_business::{Ledger, TransferRequest};
use corebank_persistence::Database;

fn ledger(db_path: &Path) -> Result<Ledger> {
    Ok(Ledger::new(Database::open(db_path)?))
}

pub fn deposit(
    db_path: &Path,
    account_id: i64,
    amount: Decimal,
    description: &str,
    reference: Option<Uuid>,
) -> Result<()> {
    let ledger = ledger(db_path)?;
    let receipt = ledger.deposit(account_id, amount, description, reference)?;
    let balance = ledger.balance(account_id)?;
    println!(
        "✅ Deposited {amount} into account {account_id} (txn {}, ref {})",
        receipt.transaction_id, receipt.reference_id
    );
    println!("   New balance: {balance}");
    Ok(())
}

pub fn withdraw(
    db_path: &Path,
    account_id: i64,
    amount: Decimal,
    description: &str,
    reference: Option<Uuid>,
) -> Result<()> {
    let ledger = ledger(db_path)?;
    let receipt = ledger.withdraw(account_id, amount, description, reference)?;
    let balance = ledger.balance(account_id)?;
    println!(
        "✅ Withdrew {amount} from account {account_id} (txn {}, ref {})",
        receipt.transaction_id, receipt.reference_id
    );
    println!("   New balance: {balance}");
    Ok(())
}

pub fn transfer(
    db_path: &Path,
    sender: i64,
    receiver: i64,
    amount: Decimal,
    description: &str,
    reference: Option<Uuid>,
) -> Result<()> {
    let ledger = ledger(db_path)?;
    let receipt = ledger.transfer(TransferRequest {
        sender_account_id: sender,
        receiver_account_id: receiver,
        amount,
        initiated_by: None,
        description: description.to_string(),
        reference_id: reference,
    })?;
    println!(
        "✅ Transferred {amount} from {sender} to {receiver} (txn {}, ref {}, {})",
        receipt.transaction_id, receipt.reference_id, receipt.status
    );
    Ok(())
}

pub fn reverse(db_path: &Path, transaction_id: i64) -> Result<()> {
    let ledger = ledger(db_path)?;
    let receipt = ledger.reverse(transaction_id, None)?;
    println!(
        "✅ Reversed transaction {transaction_id} with compensating txn {}",
        receipt.transaction_id
    );
    Ok(())
}
