//! Concurrency properties: opposite transfers cannot deadlock or lose
//! money, and over-subscribed withdrawals admit exactly the ones that fit.
//!
//! Each thread runs its own connection; the store serializes writers and
//! the engine surfaces any residual lock timeout as a retryable conflict.

mod common;

use std::thread;
use std::time::Duration;

use common::{bank, transfer_req};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use corebank_business::{LedgerError, LedgerResult};
use corebank_core::TransactionTypeCode;
use corebank_persistence::{EntryRepo, TransactionRepo};

/// Retry a ledger call on retryable conflicts with exponential backoff.
fn with_retry<T>(mut op: impl FnMut() -> LedgerResult<T>) -> LedgerResult<T> {
    let mut delay = Duration::from_millis(2);
    for _ in 0..12 {
        match op() {
            Err(e) if e.is_retryable() => {
                thread::sleep(delay);
                delay = (delay * 2).min(Duration::from_millis(250));
            }
            other => return other,
        }
    }
    op()
}

#[test]
fn opposite_transfers_complete_without_deadlock() {
    let bank = bank();
    let alice = bank.customer("alice");
    let bob = bank.customer("bob");
    let s1 = bank.savings(alice.user_id, dec!(100)).account_id;
    let s2 = bank.savings(bob.user_id, dec!(100)).account_id;

    const THREADS: usize = 10;
    const PER_THREAD: usize = 10;

    let mut handles = Vec::new();
    for i in 0..THREADS * 2 {
        let ledger = bank.ledger.clone();
        // half the threads send S1 -> S2, half S2 -> S1
        let (from, to) = if i % 2 == 0 { (s1, s2) } else { (s2, s1) };
        handles.push(thread::spawn(move || {
            for _ in 0..PER_THREAD {
                with_retry(|| ledger.transfer(transfer_req(from, to, dec!(1.0000))))
                    .expect("transfer must eventually succeed");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("no thread may deadlock or panic");
    }

    // 100 transfers each way: balances are exactly restored
    assert_eq!(bank.ledger.balance(s1).unwrap(), dec!(100));
    assert_eq!(bank.ledger.balance(s2).unwrap(), dec!(100));

    let conn = bank.db.connect().unwrap();

    // 2 seed deposits + 200 transfers x 2 legs
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transaction_entries", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2 + (THREADS * 2 * PER_THREAD * 2) as i64);

    // ledger integrity: every completed transfer sums to exactly zero
    let transfers =
        TransactionRepo::list(&conn, None, Some(TransactionTypeCode::Transfer), 500).unwrap();
    assert_eq!(transfers.len(), THREADS * 2 * PER_THREAD);
    for transfer in transfers {
        let entries = EntryRepo::list_by_transaction(&conn, transfer.transaction_id).unwrap();
        let sum: Decimal = entries.iter().map(|e| e.amount).sum();
        assert_eq!(sum, Decimal::ZERO);
    }

    // denormalized balances agree with the entry log
    for account in [s1, s2] {
        assert_eq!(
            EntryRepo::sum_posted_for_account(&conn, account).unwrap(),
            dec!(100)
        );
    }
}

#[test]
fn oversubscribed_withdrawals_admit_exactly_what_fits() {
    let bank = bank();
    let alice = bank.customer("alice");
    let account = bank.savings(alice.user_id, dec!(100)).account_id;

    const ATTEMPTS: usize = 5;
    let mut handles = Vec::new();
    for _ in 0..ATTEMPTS {
        let ledger = bank.ledger.clone();
        handles.push(thread::spawn(move || {
            with_retry(|| ledger.withdraw(account, dec!(30), "", None))
        }));
    }

    let mut successes = 0;
    let mut rejections = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => successes += 1,
            Err(e) => {
                assert!(
                    matches!(e, LedgerError::InsufficientFunds { .. }),
                    "only insufficient funds may reject: {e}"
                );
                rejections += 1;
            }
        }
    }

    // 3 x 30 fit into 100, the other 2 must be rejected
    assert_eq!(successes, 3);
    assert_eq!(rejections, ATTEMPTS - 3);
    assert_eq!(bank.ledger.balance(account).unwrap(), dec!(10));

    let conn = bank.db.connect().unwrap();
    assert_eq!(
        EntryRepo::sum_posted_for_account(&conn, account).unwrap(),
        dec!(10)
    );
}

#[test]
fn concurrent_deposits_all_post() {
    let bank = bank();
    let alice = bank.customer("alice");
    let account = bank.savings(alice.user_id, dec!(0)).account_id;

    const THREADS: usize = 8;
    const PER_THREAD: usize = 5;

    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let ledger = bank.ledger.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..PER_THREAD {
                with_retry(|| ledger.deposit(account, dec!(2.5), "", None)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = dec!(2.5) * Decimal::from((THREADS * PER_THREAD) as i64);
    assert_eq!(bank.ledger.balance(account).unwrap(), expected);

    let conn = bank.db.connect().unwrap();
    assert_eq!(
        EntryRepo::sum_posted_for_account(&conn, account).unwrap(),
        expected
    );
}
