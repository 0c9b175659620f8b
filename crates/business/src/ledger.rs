//! The transactional ledger engine.
//!
//! Every operation runs as one `BEGIN IMMEDIATE` store transaction on its
//! own connection: validate against rows read inside the transaction,
//! write header + entries + balances + audit rows, commit. Any error rolls
//! the whole operation back; there are no partial entries and no balance
//! drift. SQLite's writer lock serializes conflicting operations; reads of
//! multiple account rows always happen in ascending `account_id` order
//! before sender/receiver roles are assigned.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use corebank_core::{
    money, Account, AccountStatus, AccountType, Entry, Transaction, TransactionStatus,
    TransactionTypeCode,
};
use corebank_persistence::{
    AccountRepo, Database, EntryRepo, TransactionRepo, TransactionTypeRepo, UserRepo,
};

use crate::audit::AuditRecorder;
use crate::error::{LedgerError, LedgerResult};
use crate::guards;

/// Deployment-time engine configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// When set, a user may hold at most one non-closed account
    /// (the `uq_user_one_account` rule of the legacy seed scripts).
    pub single_account_per_user: bool,
    /// Currency applied when `create_account` is called with an empty code.
    pub default_currency: String,
    /// Bounded retries for account-number uniqueness collisions.
    pub account_number_attempts: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            single_account_per_user: false,
            default_currency: money::DEFAULT_CURRENCY.to_string(),
            account_number_attempts: 8,
        }
    }
}

/// Result of a posting operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_id: i64,
    pub reference_id: Uuid,
    pub status: TransactionStatus,
}

/// Parameters of a transfer.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub sender_account_id: i64,
    pub receiver_account_id: i64,
    pub amount: Decimal,
    pub initiated_by: Option<i64>,
    pub description: String,
    /// Client-supplied idempotency key; generated when absent
    pub reference_id: Option<Uuid>,
}

/// The transactional core. Cheap to clone; all state lives in the store.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self::with_config(db, LedgerConfig::default())
    }

    pub fn with_config(db: Database, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================================================================
    // Posting operations
    // ========================================================================

    /// Move `amount` between two accounts as one balanced double-entry
    /// transaction (debit sender, credit receiver).
    pub fn transfer(&self, req: TransferRequest) -> LedgerResult<Receipt> {
        money::validate_amount(req.amount)?;
        if req.sender_account_id == req.receiver_account_id {
            return Err(LedgerError::SameAccount(req.sender_account_id));
        }

        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reference = req.reference_id.unwrap_or_else(Uuid::new_v4);
        if let Some(receipt) = check_reference(&tx, &reference)? {
            debug!(reference = %reference, "transfer replayed idempotently");
            return Ok(receipt);
        }

        // Canonical ordering: read both rows ascending by id, then assign
        // roles. Concurrent opposite transfers cannot deadlock on these.
        let (lo, hi) = if req.sender_account_id < req.receiver_account_id {
            (req.sender_account_id, req.receiver_account_id)
        } else {
            (req.receiver_account_id, req.sender_account_id)
        };
        let lo_account = get_account(&tx, lo)?;
        let hi_account = get_account(&tx, hi)?;
        let (sender, receiver) = if lo == req.sender_account_id {
            (lo_account, hi_account)
        } else {
            (hi_account, lo_account)
        };

        guards::ensure_postable(&sender)?;
        guards::ensure_postable(&receiver)?;
        guards::ensure_same_currency(&sender, &receiver)?;
        guards::ensure_can_debit(&sender, req.amount)?;

        let description = default_description(&req.description, "Fund Transfer");
        let transfer_type = TransactionTypeRepo::get_by_code(&tx, TransactionTypeCode::Transfer)?;
        let transaction_id = TransactionRepo::insert_pending(
            &tx,
            &reference,
            transfer_type.type_id,
            &description,
            req.initiated_by,
        )?;

        let sender_after = sender.current_balance - req.amount;
        let receiver_after = receiver.current_balance + req.amount;
        guards::ensure_balance_after(sender.current_balance, -req.amount, sender_after)?;
        guards::ensure_balance_after(receiver.current_balance, req.amount, receiver_after)?;
        guards::ensure_balanced(&[-req.amount, req.amount])?;

        EntryRepo::insert(&tx, transaction_id, sender.account_id, &-req.amount, &sender_after)?;
        EntryRepo::insert(&tx, transaction_id, receiver.account_id, &req.amount, &receiver_after)?;
        AccountRepo::update_balance(&tx, sender.account_id, &sender_after)?;
        AccountRepo::update_balance(&tx, receiver.account_id, &receiver_after)?;
        TransactionRepo::mark_completed(&tx, transaction_id, Utc::now())?;
        tx.commit()?;

        info!(
            transaction_id,
            sender = sender.account_id,
            receiver = receiver.account_id,
            amount = %req.amount,
            "transfer completed"
        );
        Ok(Receipt {
            transaction_id,
            reference_id: reference,
            status: TransactionStatus::Completed,
        })
    }

    /// Credit `amount` to an account as a single-entry DEPOSIT transaction.
    pub fn deposit(
        &self,
        account_id: i64,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> LedgerResult<Receipt> {
        self.post_single(
            account_id,
            amount,
            TransactionTypeCode::Deposit,
            &default_description(description, "Cash Deposit"),
            reference_id,
        )
    }

    /// Debit `amount` from an account as a single-entry WITHDRAWAL
    /// transaction. Rejected with `InsufficientFunds` when the resulting
    /// balance would be negative on a non-loan account.
    pub fn withdraw(
        &self,
        account_id: i64,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> LedgerResult<Receipt> {
        self.post_single(
            account_id,
            amount,
            TransactionTypeCode::Withdrawal,
            &default_description(description, "Cash Withdrawal"),
            reference_id,
        )
    }

    fn post_single(
        &self,
        account_id: i64,
        amount: Decimal,
        type_code: TransactionTypeCode,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> LedgerResult<Receipt> {
        money::validate_amount(amount)?;
        let signed = match type_code {
            TransactionTypeCode::Withdrawal => -amount,
            _ => amount,
        };

        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let reference = reference_id.unwrap_or_else(Uuid::new_v4);
        if let Some(receipt) = check_reference(&tx, &reference)? {
            debug!(reference = %reference, "posting replayed idempotently");
            return Ok(receipt);
        }

        let account = get_account(&tx, account_id)?;
        guards::ensure_postable(&account)?;
        if signed < Decimal::ZERO {
            guards::ensure_can_debit(&account, amount)?;
        }

        let txn_type = TransactionTypeRepo::get_by_code(&tx, type_code)?;
        let transaction_id = TransactionRepo::insert_pending(
            &tx,
            &reference,
            txn_type.type_id,
            description,
            Some(account.user_id),
        )?;

        let balance_after = account.current_balance + signed;
        guards::ensure_balance_after(account.current_balance, signed, balance_after)?;

        EntryRepo::insert(&tx, transaction_id, account.account_id, &signed, &balance_after)?;
        AccountRepo::update_balance(&tx, account.account_id, &balance_after)?;
        TransactionRepo::mark_completed(&tx, transaction_id, Utc::now())?;
        tx.commit()?;

        info!(
            transaction_id,
            account = account.account_id,
            amount = %signed,
            type_code = %type_code,
            "posting completed"
        );
        Ok(Receipt {
            transaction_id,
            reference_id: reference,
            status: TransactionStatus::Completed,
        })
    }

    /// Post a compensating transaction whose entries exactly negate a
    /// completed transaction's, then mark the original `reversed`. The
    /// original rows are never edited.
    pub fn reverse(&self, transaction_id: i64, initiated_by: Option<i64>) -> LedgerResult<Receipt> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let original = TransactionRepo::get(&tx, transaction_id)
            .map_err(|e| not_found_as(e, LedgerError::TransactionNotFound(transaction_id)))?;
        if original.status != TransactionStatus::Completed {
            return Err(LedgerError::NotReversible {
                transaction_id,
                status: original.status,
            });
        }
        let entries = EntryRepo::list_by_transaction(&tx, transaction_id)?;

        // Read every touched account once, ascending by id.
        let touched: std::collections::BTreeSet<i64> =
            entries.iter().map(|e| e.account_id).collect();
        let mut accounts: BTreeMap<i64, Account> = BTreeMap::new();
        for account_id in touched {
            accounts.insert(account_id, get_account(&tx, account_id)?);
        }
        for account in accounts.values() {
            guards::ensure_postable(account)?;
        }

        // Negating a credit debits the account; that debit is still subject
        // to the non-negativity rule.
        let mut balances: BTreeMap<i64, Decimal> = accounts
            .iter()
            .map(|(id, account)| (*id, account.current_balance))
            .collect();
        for entry in &entries {
            let negated = -entry.amount;
            if negated < Decimal::ZERO {
                let account = &accounts[&entry.account_id];
                let projected = Account {
                    current_balance: balances[&entry.account_id],
                    ..account.clone()
                };
                guards::ensure_can_debit(&projected, -negated)?;
            }
            *balances.get_mut(&entry.account_id).expect("account read above") += negated;
        }

        let reference = Uuid::new_v4();
        let txn_type = TransactionTypeRepo::get_by_code(&tx, original.type_code)?;
        let reversal_id = TransactionRepo::insert_pending(
            &tx,
            &reference,
            txn_type.type_id,
            &format!("Reversal of {}", original.reference_id),
            initiated_by,
        )?;

        let mut running: BTreeMap<i64, Decimal> = accounts
            .iter()
            .map(|(id, account)| (*id, account.current_balance))
            .collect();
        for entry in &entries {
            let negated = -entry.amount;
            let prior = running[&entry.account_id];
            let after = prior + negated;
            guards::ensure_balance_after(prior, negated, after)?;
            EntryRepo::insert(&tx, reversal_id, entry.account_id, &negated, &after)?;
            *running.get_mut(&entry.account_id).expect("account read above") = after;
        }
        for (account_id, balance) in &running {
            AccountRepo::update_balance(&tx, *account_id, balance)?;
        }
        TransactionRepo::mark_completed(&tx, reversal_id, Utc::now())?;
        TransactionRepo::set_status(&tx, transaction_id, TransactionStatus::Reversed)?;
        tx.commit()?;

        info!(original = transaction_id, reversal = reversal_id, "transaction reversed");
        Ok(Receipt {
            transaction_id: reversal_id,
            reference_id: reference,
            status: TransactionStatus::Completed,
        })
    }

    // ========================================================================
    // Account lifecycle
    // ========================================================================

    /// Open an account for a user. The generated account number is a
    /// two-letter type prefix plus eight random decimal digits.
    pub fn create_account(
        &self,
        user_id: i64,
        account_type: AccountType,
        currency: &str,
    ) -> LedgerResult<Account> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let account = create_account_in_tx(
            &tx,
            &self.config,
            user_id,
            account_type,
            currency,
            Some(&user_id.to_string()),
        )?;
        tx.commit()?;
        info!(
            account = account.account_id,
            number = %account.account_number,
            "account created"
        );
        Ok(account)
    }

    /// Toggle `active <-> frozen`. Closed accounts reject the toggle.
    pub fn freeze_account(&self, account_id: i64) -> LedgerResult<AccountStatus> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let status = toggle_freeze_in_tx(&tx, account_id, None)?;
        tx.commit()?;
        info!(account = account_id, status = %status, "account freeze toggled");
        Ok(status)
    }

    /// Close an account. Requires an exactly zero balance; terminal.
    pub fn close_account(&self, account_id: i64) -> LedgerResult<()> {
        let mut conn = self.db.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        close_account_in_tx(&tx, account_id, None)?;
        tx.commit()?;
        info!(account = account_id, "account closed");
        Ok(())
    }

    // ========================================================================
    // Point reads
    // ========================================================================

    /// Current balance of one account.
    pub fn balance(&self, account_id: i64) -> LedgerResult<Decimal> {
        let conn = self.db.connect()?;
        Ok(get_account(&conn, account_id)?.current_balance)
    }

    /// Fetch one transaction header.
    pub fn transaction(&self, transaction_id: i64) -> LedgerResult<Transaction> {
        let conn = self.db.connect()?;
        TransactionRepo::get(&conn, transaction_id)
            .map_err(|e| not_found_as(e, LedgerError::TransactionNotFound(transaction_id)))
    }

    /// Fetch the entries of one transaction in commit order.
    pub fn entries(&self, transaction_id: i64) -> LedgerResult<Vec<Entry>> {
        let conn = self.db.connect()?;
        Ok(EntryRepo::list_by_transaction(&conn, transaction_id)?)
    }
}

// ============================================================================
// Shared transaction-scoped helpers (also used by the admin service)
// ============================================================================

fn default_description(description: &str, fallback: &str) -> String {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn not_found_as(e: corebank_persistence::PersistenceError, err: LedgerError) -> LedgerError {
    if e.is_not_found() {
        err
    } else {
        e.into()
    }
}

pub(crate) fn get_account(conn: &Connection, account_id: i64) -> LedgerResult<Account> {
    AccountRepo::get(conn, account_id)
        .map_err(|e| not_found_as(e, LedgerError::AccountNotFound(account_id)))
}

pub(crate) fn get_user(conn: &Connection, user_id: i64) -> LedgerResult<corebank_core::User> {
    UserRepo::get(conn, user_id).map_err(|e| not_found_as(e, LedgerError::UserNotFound(user_id)))
}

/// Idempotency lookup: a completed header replays as success, any other
/// status is reported as a duplicate for the caller to resolve (the engine
/// never resumes a stranded pending).
fn check_reference(conn: &Connection, reference: &Uuid) -> LedgerResult<Option<Receipt>> {
    match TransactionRepo::find_by_reference(conn, reference)? {
        None => Ok(None),
        Some(existing) if existing.status == TransactionStatus::Completed => Ok(Some(Receipt {
            transaction_id: existing.transaction_id,
            reference_id: existing.reference_id,
            status: existing.status,
        })),
        Some(_) => Err(LedgerError::DuplicateReference(*reference)),
    }
}

pub(crate) fn create_account_in_tx(
    conn: &Connection,
    config: &LedgerConfig,
    user_id: i64,
    account_type: AccountType,
    currency: &str,
    performed_by: Option<&str>,
) -> LedgerResult<Account> {
    let currency = if currency.trim().is_empty() {
        config.default_currency.clone()
    } else {
        money::validate_currency(currency)?
    };

    let user = get_user(conn, user_id)?;
    if !user.is_active {
        return Err(LedgerError::UserNotActive(user_id));
    }
    if config.single_account_per_user && AccountRepo::count_open_for_user(conn, user_id)? > 0 {
        return Err(LedgerError::AccountLimitReached(user_id));
    }

    // Uniform random candidates from a 10^8 domain; collisions retry a
    // bounded number of times before giving up.
    let mut last_err = None;
    for _ in 0..config.account_number_attempts {
        let number = generate_account_number(account_type);
        match AccountRepo::insert(conn, user_id, &number, account_type, &currency) {
            Ok(account) => {
                AuditRecorder::account_created(conn, &account, performed_by)?;
                return Ok(account);
            }
            Err(e) if e.is_unique_violation() => {
                debug!(number = %number, "account number collision, retrying");
                last_err = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(LedgerError::Internal(format!(
        "exhausted account number attempts: {}",
        last_err.map(|e| e.to_string()).unwrap_or_default()
    )))
}

fn generate_account_number(account_type: AccountType) -> String {
    let digits: u32 = rand::thread_rng().gen_range(0..100_000_000);
    format!("{}{digits:08}", account_type.number_prefix())
}

pub(crate) fn toggle_freeze_in_tx(
    conn: &Connection,
    account_id: i64,
    performed_by: Option<&str>,
) -> LedgerResult<AccountStatus> {
    let account = get_account(conn, account_id)?;
    let new_status = match account.status {
        AccountStatus::Active => AccountStatus::Frozen,
        AccountStatus::Frozen => AccountStatus::Active,
        AccountStatus::Closed => return Err(LedgerError::AccountClosed(account_id)),
    };
    AccountRepo::update_status(conn, account_id, new_status)?;
    AuditRecorder::account_status_changed(conn, account_id, account.status, new_status, performed_by)?;
    Ok(new_status)
}

pub(crate) fn close_account_in_tx(
    conn: &Connection,
    account_id: i64,
    performed_by: Option<&str>,
) -> LedgerResult<()> {
    let account = get_account(conn, account_id)?;
    if account.status == AccountStatus::Closed {
        return Err(LedgerError::AlreadyClosed(account_id));
    }
    if account.current_balance != Decimal::ZERO {
        return Err(LedgerError::NonZeroBalance {
            account_id,
            balance: account.current_balance,
        });
    }
    AccountRepo::update_status(conn, account_id, AccountStatus::Closed)?;
    AuditRecorder::account_status_changed(
        conn,
        account_id,
        account.status,
        AccountStatus::Closed,
        performed_by,
    )?;
    Ok(())
}
