//! Shared test fixtures: a fresh on-disk bank per test.
#![allow(dead_code)]

use rust_decimal::Decimal;
use tempfile::TempDir;

use corebank_business::{AdminService, Ledger, LedgerConfig, TransferRequest, UserService};
use corebank_core::{Account, AccountType, Department, Employee, NewEmployee, NewUser, User};
use corebank_persistence::Database;

pub struct TestBank {
    // Held so the database file outlives the test
    #[allow(dead_code)]
    dir: TempDir,
    pub db: Database,
    pub ledger: Ledger,
    pub admin: AdminService,
    pub users: UserService,
}

pub fn bank() -> TestBank {
    bank_with_config(LedgerConfig::default())
}

pub fn bank_with_config(config: LedgerConfig) -> TestBank {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path().join("corebank.db")).expect("open database");
    TestBank {
        dir,
        ledger: Ledger::with_config(db.clone(), config.clone()),
        admin: AdminService::with_config(db.clone(), config),
        users: UserService::new(db.clone()),
        db,
    }
}

impl TestBank {
    /// Register a customer with derived unique fields.
    pub fn customer(&self, username: &str) -> User {
        self.users
            .register(&NewUser::new(
                username,
                "$argon2id$stub",
                &format!("{username}@example.com"),
                &format!("{username} test"),
            ))
            .expect("register user")
    }

    /// Open a savings account and optionally seed it with a deposit.
    pub fn savings(&self, user_id: i64, opening: Decimal) -> Account {
        let account = self
            .ledger
            .create_account(user_id, AccountType::Savings, "USD")
            .expect("create account");
        if opening > Decimal::ZERO {
            self.ledger
                .deposit(account.account_id, opening, "seed", None)
                .expect("seed deposit");
        }
        account
    }

    /// Provision an active operations employee.
    pub fn employee(&self, employee_id: &str) -> Employee {
        self.admin
            .register_employee(&NewEmployee::new(
                employee_id,
                "$argon2id$stub",
                "Op Erator",
                &format!("{employee_id}@corebank.test"),
                Department::Operations,
            ))
            .expect("register employee")
    }
}

/// Convenience constructor for transfer requests.
pub fn transfer_req(sender: i64, receiver: i64, amount: Decimal) -> TransferRequest {
    TransferRequest {
        sender_account_id: sender,
        receiver_account_id: receiver,
        amount,
        initiated_by: None,
        description: String::new(),
        reference_id: None,
    }
}
