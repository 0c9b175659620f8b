//! CoreBank CLI - ledger operations from the command line
//!
//! Usage:
//! ```bash
//! corebank init
//! corebank seed
//! corebank account create --user 1 --type savings
//! corebank deposit 1 1000.0000 --description "opening balance"
//! corebank transfer 1 2 250.0000
//! corebank statement 1
//! corebank integrity
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

mod commands;
mod db;

use commands::{account, ledger, report};

/// CoreBank - a double-entry core-banking ledger on SQLite
#[derive(Parser)]
#[command(name = "corebank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/corebank.db", global = true)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init {
        /// Drop an existing database first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Seed demo users, accounts, and transactions
    Seed,

    /// User and account management
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Deposit funds into an account
    Deposit {
        /// Account id
        account_id: i64,
        /// Amount (scale <= 4)
        amount: Decimal,
        /// Narrative recorded on the transaction
        #[arg(long, short, default_value = "")]
        description: String,
        /// Idempotency reference (UUID)
        #[arg(long)]
        reference: Option<Uuid>,
    },

    /// Withdraw funds from an account
    Withdraw {
        account_id: i64,
        amount: Decimal,
        #[arg(long, short, default_value = "")]
        description: String,
        #[arg(long)]
        reference: Option<Uuid>,
    },

    /// Transfer funds between two accounts
    Transfer {
        sender_account_id: i64,
        receiver_account_id: i64,
        amount: Decimal,
        #[arg(long, short, default_value = "")]
        description: String,
        #[arg(long)]
        reference: Option<Uuid>,
    },

    /// Reverse a completed transaction
    Reverse {
        transaction_id: i64,
    },

    /// Last entries of one account
    Statement {
        account_id: i64,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Paginated history across a user's accounts
    History {
        user_id: i64,
        /// Filter by transaction type
        #[arg(long, short = 't')]
        r#type: Option<TypeCodeArg>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Ledger integrity check (expect no rows)
    Integrity,

    /// Balance sheet per currency
    BalanceSheet,
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Register a user
    Register {
        #[arg(long, short)]
        username: String,
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        full_name: String,
        /// Opaque KDF output; hashing happens in the API layer
        #[arg(long, default_value = "$argon2id$unset")]
        password_hash: String,
    },
    /// Open an account for a user
    Create {
        #[arg(long, short)]
        user: i64,
        #[arg(long, short = 't', default_value = "savings")]
        r#type: AccountTypeArg,
        #[arg(long, short, default_value = "")]
        currency: String,
    },
    /// List a user's accounts
    List {
        #[arg(long, short)]
        user: i64,
    },
    /// Show an account's balance
    Balance {
        account_id: i64,
    },
    /// Toggle frozen status
    Freeze {
        account_id: i64,
    },
    /// Close an account (zero balance required)
    Close {
        account_id: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AccountTypeArg {
    Savings,
    Checking,
    Wallet,
    Loan,
}

impl AccountTypeArg {
    pub fn to_core_type(self) -> corebank_core::AccountType {
        match self {
            AccountTypeArg::Savings => corebank_core::AccountType::Savings,
            AccountTypeArg::Checking => corebank_core::AccountType::Checking,
            AccountTypeArg::Wallet => corebank_core::AccountType::Wallet,
            AccountTypeArg::Loan => corebank_core::AccountType::Loan,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum TypeCodeArg {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Interest,
    Fee,
}

impl TypeCodeArg {
    pub fn to_core_type(self) -> corebank_core::TransactionTypeCode {
        match self {
            TypeCodeArg::Deposit => corebank_core::TransactionTypeCode::Deposit,
            TypeCodeArg::Withdrawal => corebank_core::TransactionTypeCode::Withdrawal,
            TypeCodeArg::Transfer => corebank_core::TransactionTypeCode::Transfer,
            TypeCodeArg::Payment => corebank_core::TransactionTypeCode::Payment,
            TypeCodeArg::Interest => corebank_core::TransactionTypeCode::Interest,
            TypeCodeArg::Fee => corebank_core::TransactionTypeCode::Fee,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, force)?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db)?;
        }

        Commands::Seed => {
            db::seed_demo(&cli.db)?;
        }

        Commands::Account { action } => {
            account::handle(&cli.db, action)?;
        }

        Commands::Deposit {
            account_id,
            amount,
            description,
            reference,
        } => {
            ledger::deposit(&cli.db, account_id, amount, &description, reference)?;
        }

        Commands::Withdraw {
            account_id,
            amount,
            description,
            reference,
        } => {
            ledger::withdraw(&cli.db, account_id, amount, &description, reference)?;
        }

        Commands::Transfer {
            sender_account_id,
            receiver_account_id,
            amount,
            description,
            reference,
        } => {
            ledger::transfer(
                &cli.db,
                sender_account_id,
                receiver_account_id,
                amount,
                &description,
                reference,
            )?;
        }

        Commands::Reverse { transaction_id } => {
            ledger::reverse(&cli.db, transaction_id)?;
        }

        Commands::Statement { account_id, limit } => {
            report::statement(&cli.db, account_id, limit)?;
        }

        Commands::History {
            user_id,
            r#type,
            limit,
            offset,
        } => {
            report::history(&cli.db, user_id, r#type.map(TypeCodeArg::to_core_type), limit, offset)?;
        }

        Commands::Integrity => {
            report::integrity(&cli.db)?;
        }

        Commands::BalanceSheet => {
            report::balance_sheet(&cli.db)?;
        }
    }

    Ok(())
}
