//! Pre-commit invariant guards.
//!
//! These run inside the engine's store transaction against freshly read
//! rows, so a rejection rolls the whole operation back. The SQL triggers
//! in the schema repeat the same rules as a second line of defense.

use rust_decimal::Decimal;

use corebank_core::Account;

use crate::error::{LedgerError, LedgerResult};

/// An entry may only be posted to an active account.
pub fn ensure_postable(account: &Account) -> LedgerResult<()> {
    if account.is_active() {
        Ok(())
    } else {
        Err(LedgerError::AccountNotActive {
            account_id: account.account_id,
            status: account.status,
        })
    }
}

/// A debit of `amount` must not take a non-loan account below zero.
pub fn ensure_can_debit(account: &Account, amount: Decimal) -> LedgerResult<()> {
    if account.would_overdraw(amount) {
        Err(LedgerError::InsufficientFunds {
            account_id: account.account_id,
            requested: amount,
            available: account.current_balance,
        })
    } else {
        Ok(())
    }
}

/// Both legs of a transfer must be in the same currency.
pub fn ensure_same_currency(sender: &Account, receiver: &Account) -> LedgerResult<()> {
    if sender.currency == receiver.currency {
        Ok(())
    } else {
        Err(LedgerError::CurrencyMismatch {
            expected: sender.currency.clone(),
            actual: receiver.currency.clone(),
        })
    }
}

/// `balance_after` must equal the prior balance plus the signed amount.
pub fn ensure_balance_after(
    prior: Decimal,
    amount: Decimal,
    balance_after: Decimal,
) -> LedgerResult<()> {
    if prior + amount == balance_after {
        Ok(())
    } else {
        Err(LedgerError::Internal(format!(
            "balance_after mismatch: {prior} + {amount} != {balance_after}"
        )))
    }
}

/// Transfer legs must sum to zero exactly.
pub fn ensure_balanced(amounts: &[Decimal]) -> LedgerResult<()> {
    let sum: Decimal = amounts.iter().copied().sum();
    if sum == Decimal::ZERO {
        Ok(())
    } else {
        Err(LedgerError::Internal(format!(
            "unbalanced transfer: legs sum to {sum}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use corebank_core::{AccountStatus, AccountType};
    use rust_decimal_macros::dec;

    fn account(account_type: AccountType, status: AccountStatus, balance: Decimal) -> Account {
        Account {
            account_id: 1,
            user_id: 1,
            account_number: "SB00000001".to_string(),
            account_type,
            currency: "USD".to_string(),
            current_balance: balance,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_postable_rejects_frozen_and_closed() {
        let active = account(AccountType::Savings, AccountStatus::Active, dec!(10));
        assert!(ensure_postable(&active).is_ok());

        let frozen = account(AccountType::Savings, AccountStatus::Frozen, dec!(10));
        assert!(matches!(
            ensure_postable(&frozen),
            Err(LedgerError::AccountNotActive { .. })
        ));

        let closed = account(AccountType::Savings, AccountStatus::Closed, dec!(0));
        assert!(ensure_postable(&closed).is_err());
    }

    #[test]
    fn test_debit_guard() {
        let savings = account(AccountType::Savings, AccountStatus::Active, dec!(100));
        assert!(ensure_can_debit(&savings, dec!(100)).is_ok());
        assert!(ensure_can_debit(&savings, dec!(100.0001)).is_err());

        // loan accounts may overdraw
        let loan = account(AccountType::Loan, AccountStatus::Active, dec!(0));
        assert!(ensure_can_debit(&loan, dec!(9999)).is_ok());
    }

    #[test]
    fn test_currency_guard() {
        let usd = account(AccountType::Savings, AccountStatus::Active, dec!(0));
        let mut inr = account(AccountType::Checking, AccountStatus::Active, dec!(0));
        inr.currency = "INR".to_string();

        assert!(ensure_same_currency(&usd, &usd).is_ok());
        assert!(matches!(
            ensure_same_currency(&usd, &inr),
            Err(LedgerError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_balance_after_guard() {
        assert!(ensure_balance_after(dec!(1000), dec!(-200), dec!(800)).is_ok());
        assert!(ensure_balance_after(dec!(1000), dec!(-200), dec!(801)).is_err());
    }

    #[test]
    fn test_balanced_guard() {
        assert!(ensure_balanced(&[dec!(-200), dec!(200)]).is_ok());
        assert!(ensure_balanced(&[dec!(-200), dec!(200.0001)]).is_err());
    }
}
