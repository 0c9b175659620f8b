//! User registration and account lifecycle commands.

use anyhow::Result;
use std::path::Path;

use corebank_business::{Ledger, UserService};
use corebank_core::NewUser;
use corebank_persistence::{AccountRepo, Database};

use crate::AccountAction;

pub fn handle(db_path: &Path, action: AccountAction) -> Result<()> {
    let db = Database::open(db_path)?;
    let ledger = Ledger::new(db.clone());

    match action {
        AccountAction::Register {
            username,
            email,
            full_name,
            password_hash,
        } => {
            let users = UserService::new(db);
            let user = users.register(&NewUser::new(&username, &password_hash, &email, &full_name))?;
            println!("✅ Registered user {} (id {})", user.username, user.user_id);
        }

        AccountAction::Create {
            user,
            r#type,
            currency,
        } => {
            let account = ledger.create_account(user, r#type.to_core_type(), &currency)?;
            println!(
                "✅ Opened {} account {} ({}) for user {}",
                account.account_type, account.account_id, account.account_number, user
            );
        }

        AccountAction::List { user } => {
            let conn = db.connect()?;
            let accounts = AccountRepo::list_by_user(&conn, user)?;
            if accounts.is_empty() {
                println!("No accounts for user {user}");
            }
            for account in accounts {
                println!(
                    "  {:>4}  {}  {:8}  {:>16} {}  [{}]",
                    account.account_id,
                    account.account_number,
                    account.account_type,
                    account.current_balance,
                    account.currency,
                    account.status,
                );
            }
        }

        AccountAction::Balance { account_id } => {
            let balance = ledger.balance(account_id)?;
            println!("Account {account_id}: {balance}");
        }

        AccountAction::Freeze { account_id } => {
            let status = ledger.freeze_account(account_id)?;
            println!("✅ Account {account_id} is now {status}");
        }

        AccountAction::Close { account_id } => {
            ledger.close_account(account_id)?;
            println!("✅ Account {account_id} closed");
        }
    }

    Ok(())
}
