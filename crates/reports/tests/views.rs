//! View-layer tests against ledgers built through the engine.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use corebank_business::{Ledger, TransferRequest, UserService};
use corebank_core::{Account, AccountType, NewUser, TransactionTypeCode, User, Verdict};
use corebank_persistence::{
    Database, EntryRepo, NewRiskScore, RiskScoreRepo, TransactionRepo, TransactionTypeRepo,
};
use corebank_reports as reports;
use corebank_reports::HistoryFilter;

struct Fixture {
    #[allow(dead_code)]
    dir: TempDir,
    db: Database,
    ledger: Ledger,
    users: UserService,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("corebank.db")).unwrap();
    Fixture {
        dir,
        ledger: Ledger::new(db.clone()),
        users: UserService::new(db.clone()),
        db,
    }
}

impl Fixture {
    fn customer(&self, username: &str) -> User {
        self.users
            .register(&NewUser::new(
                username,
                "$argon2id$stub",
                &format!("{username}@example.com"),
                &format!("{username} test"),
            ))
            .unwrap()
    }

    fn account(&self, user_id: i64, currency: &str, opening: Decimal) -> Account {
        let account = self
            .ledger
            .create_account(user_id, AccountType::Savings, currency)
            .unwrap();
        if opening > Decimal::ZERO {
            self.ledger
                .deposit(account.account_id, opening, "seed", None)
                .unwrap();
        }
        account
    }

    fn transfer(&self, from: i64, to: i64, amount: Decimal, description: &str) -> i64 {
        self.ledger
            .transfer(TransferRequest {
                sender_account_id: from,
                receiver_account_id: to,
                amount,
                initiated_by: None,
                description: description.to_string(),
                reference_id: None,
            })
            .unwrap()
            .transaction_id
    }
}

#[test]
fn balance_sheet_groups_by_currency() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    fx.account(alice.user_id, "USD", dec!(1000.5));
    fx.account(bob.user_id, "USD", dec!(499.5));
    fx.account(bob.user_id, "INR", dec!(75000));

    let conn = fx.db.connect().unwrap();
    let sheet = reports::balance_sheet(&conn).unwrap();
    assert_eq!(sheet.len(), 2);

    let inr = &sheet[0];
    assert_eq!(inr.currency, "INR");
    assert_eq!(inr.account_count, 1);
    assert_eq!(inr.total_balance, dec!(75000));

    let usd = &sheet[1];
    assert_eq!(usd.currency, "USD");
    assert_eq!(usd.account_count, 2);
    assert_eq!(usd.total_balance, dec!(1500));
}

#[test]
fn integrity_view_is_empty_on_a_healthy_ledger() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    let a = fx.account(alice.user_id, "USD", dec!(500));
    let b = fx.account(bob.user_id, "USD", dec!(500));

    for _ in 0..5 {
        fx.transfer(a.account_id, b.account_id, dec!(7.7777), "ping");
        fx.transfer(b.account_id, a.account_id, dec!(7.7777), "pong");
    }

    let conn = fx.db.connect().unwrap();
    assert!(reports::ledger_integrity(&conn).unwrap().is_empty());
}

#[test]
fn integrity_view_surfaces_a_lopsided_transfer() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let account = fx.account(alice.user_id, "USD", dec!(100));

    // Bypass the engine and post a transfer with a single leg, the kind of
    // corruption the view exists to catch.
    let conn = fx.db.connect().unwrap();
    let transfer_type =
        TransactionTypeRepo::get_by_code(&conn, TransactionTypeCode::Transfer).unwrap();
    let bad = TransactionRepo::insert_pending(
        &conn,
        &uuid::Uuid::new_v4(),
        transfer_type.type_id,
        "manual correction gone wrong",
        None,
    )
    .unwrap();
    EntryRepo::insert(&conn, bad, account.account_id, &dec!(-40), &dec!(60)).unwrap();
    TransactionRepo::mark_completed(&conn, bad, Utc::now()).unwrap();

    let breaks = reports::ledger_integrity(&conn).unwrap();
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].transaction_id, bad);
    assert_eq!(breaks[0].net_sum, dec!(-40));
    assert_eq!(breaks[0].entry_count, 1);
}

#[test]
fn customer_statement_is_newest_first() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    let a = fx.account(alice.user_id, "USD", dec!(1000));
    let b = fx.account(bob.user_id, "USD", dec!(0));

    fx.transfer(a.account_id, b.account_id, dec!(200), "rent march");
    fx.ledger.withdraw(a.account_id, dec!(50), "atm", None).unwrap();

    let conn = fx.db.connect().unwrap();
    let lines = reports::customer_statement(&conn, alice.user_id, 100).unwrap();
    // seed deposit, transfer debit, withdrawal - newest first
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].type_code, TransactionTypeCode::Withdrawal);
    assert_eq!(lines[0].amount, dec!(-50));
    assert_eq!(lines[0].balance_after, dec!(750));
    assert_eq!(lines[1].type_code, TransactionTypeCode::Transfer);
    assert_eq!(lines[1].narrative, "rent march");
    assert_eq!(lines[2].type_code, TransactionTypeCode::Deposit);
    assert_eq!(lines[2].balance_after, dec!(1000));

    // bob sees only his credit leg
    let lines = reports::customer_statement(&conn, bob.user_id, 100).unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].amount, dec!(200));
    assert_eq!(lines[0].account_number, b.account_number);
}

#[test]
fn mini_statement_returns_last_n() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let a = fx.account(alice.user_id, "USD", dec!(0));

    for i in 1..=6 {
        fx.ledger
            .deposit(a.account_id, Decimal::from(i), &format!("d{i}"), None)
            .unwrap();
    }

    let conn = fx.db.connect().unwrap();
    let lines = reports::mini_statement(&conn, a.account_id, 3).unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].narrative, "d6");
    assert_eq!(lines[0].balance_after, dec!(21));
    assert_eq!(lines[2].narrative, "d4");
}

#[test]
fn history_filters_compose() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    let a = fx.account(alice.user_id, "USD", dec!(1000));
    let b = fx.account(bob.user_id, "USD", dec!(0));

    fx.transfer(a.account_id, b.account_id, dec!(300), "rent march");
    fx.transfer(a.account_id, b.account_id, dec!(12.5), "coffee");
    fx.ledger.withdraw(a.account_id, dec!(40), "atm", None).unwrap();

    let conn = fx.db.connect().unwrap();

    // by type
    let lines = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            type_code: Some(TransactionTypeCode::Transfer),
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(lines.len(), 2);

    // by amount magnitude
    let lines = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            min_amount: Some(dec!(40)),
            max_amount: Some(dec!(500)),
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    // 300 transfer debit and 40 withdrawal match; 12.5 and 1000 do not
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| {
        let m = l.amount.abs();
        m >= dec!(40) && m <= dec!(500)
    }));

    // by description substring
    let lines = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            description_contains: Some("rent".to_string()),
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].narrative, "rent march");

    // by date range: nothing a day ago, everything now
    let lines = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            to: Some(Utc::now() - Duration::days(1)),
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    assert!(lines.is_empty());
    let lines = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            from: Some(Utc::now() - Duration::days(1)),
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(lines.len(), 4);

    // pagination
    let page1 = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            limit: 2,
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    let page2 = reports::history(
        &conn,
        alice.user_id,
        &HistoryFilter {
            limit: 2,
            offset: 2,
            ..HistoryFilter::default()
        },
    )
    .unwrap();
    assert_eq!(page1.len(), 2);
    assert_eq!(page2.len(), 2);
    assert!(page1[0].entry_id > page2[0].entry_id);
}

#[test]
fn flagged_transactions_order_by_risk() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    let a = fx.account(alice.user_id, "USD", dec!(10000));
    let b = fx.account(bob.user_id, "USD", dec!(0));

    let t1 = fx.transfer(a.account_id, b.account_id, dec!(9500), "structuring?");
    let t2 = fx.transfer(a.account_id, b.account_id, dec!(10), "coffee");
    let t3 = fx.transfer(a.account_id, b.account_id, dec!(400), "odd hour");

    let conn = fx.db.connect().unwrap();
    for (txn, score, verdict) in [
        (t1, 0.97, Verdict::Critical),
        (t2, 0.03, Verdict::Safe),
        (t3, 0.71, Verdict::Suspicious),
    ] {
        RiskScoreRepo::insert(
            &conn,
            &NewRiskScore {
                transaction_id: txn,
                risk_score: score,
                verdict,
                features_used: serde_json::json!({"amount": score * 10000.0}),
                model_version: "v1.0".to_string(),
            },
        )
        .unwrap();
    }

    let flagged = reports::flagged_transactions(&conn, 50).unwrap();
    assert_eq!(flagged.len(), 2, "SAFE verdicts are excluded");
    assert_eq!(flagged[0].transaction_id, t1);
    assert_eq!(flagged[0].verdict, Verdict::Critical);
    assert_eq!(flagged[1].transaction_id, t3);

    // the unscored poll no longer returns scored transactions
    let unscored = reports::unscored_transactions(&conn, 50).unwrap();
    assert!(unscored.iter().all(|t| ![t1, t2, t3].contains(&t.transaction_id)));
}

#[test]
fn overview_counts_the_world() {
    let fx = fixture();
    let alice = fx.customer("alice");
    let bob = fx.customer("bob");
    let a = fx.account(alice.user_id, "USD", dec!(100));
    fx.account(bob.user_id, "USD", dec!(50));
    fx.ledger.freeze_account(a.account_id).unwrap();

    let conn = fx.db.connect().unwrap();
    let overview = reports::overview(&conn).unwrap();

    assert_eq!(overview.total_users, 2);
    assert_eq!(overview.active_users, 2);
    assert_eq!(overview.pending_kyc, 2);
    assert_eq!(overview.total_accounts, 2);
    assert_eq!(overview.frozen_accounts, 1);
    // two seed deposits
    assert_eq!(overview.total_transactions, 2);
    assert_eq!(overview.recent_transactions_24h, 2);
    // only the active account counts toward the system balance
    assert_eq!(overview.system_balance.len(), 1);
    assert_eq!(overview.system_balance[0].currency, "USD");
    assert_eq!(overview.system_balance[0].total_balance, dec!(50));
}
