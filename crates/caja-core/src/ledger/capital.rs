//! # Cash Account Ledger
//!
//! Contributions, initial capital and withdrawals on the per-tenant
//! cash account singleton.
//!
//! ```text
//! contribute(a)           current += a        initial += a
//! set_initial(a)          current = initial = a,  profit = 0
//! withdraw(a, Profit)     current −= a        profit  −= a     (a ≤ both)
//! withdraw(a, Capital)    current −= a        initial −= a     (a ≤ both)
//! ```
//!
//! A tenant without a stored account behaves as if it held a zeroed one.

use chrono::{DateTime, Utc};

use crate::document::{Plan, ReadSet, Snapshot, WriteSet};
use crate::error::{CoreError, CoreResult};
use crate::ledger::load_cash_account;
use crate::money::Money;
use crate::types::{CashAccount, WithdrawSource};
use crate::validation::validate_amount_cents;
use crate::CASH_ACCOUNT_ID;

pub fn cash_account_reads() -> ReadSet {
    ReadSet::new().doc::<CashAccount>(CASH_ACCOUNT_ID)
}

fn insufficient(source_name: &str, available: i64, requested: Money) -> CoreError {
    CoreError::InsufficientFunds {
        source_name: source_name.to_string(),
        available_cents: available,
        requested_cents: requested.cents(),
    }
}

/// Takes `amount` out of the drawer, optionally booking it against a source.
///
/// Shared by withdrawals and payable payments.
pub(crate) fn debit(
    account: &mut CashAccount,
    amount: Money,
    source: Option<WithdrawSource>,
) -> CoreResult<()> {
    if amount.cents() > account.current_capital_cents {
        return Err(insufficient(
            "current capital",
            account.current_capital_cents,
            amount,
        ));
    }

    match source {
        Some(WithdrawSource::Profit) => {
            if amount.cents() > account.total_profit_cents {
                return Err(insufficient("profit", account.total_profit_cents, amount));
            }
            account.total_profit_cents -= amount.cents();
        }
        Some(WithdrawSource::Capital) => {
            if amount.cents() > account.initial_capital_cents {
                return Err(insufficient(
                    "initial capital",
                    account.initial_capital_cents,
                    amount,
                ));
            }
            account.initial_capital_cents -= amount.cents();
        }
        None => {}
    }

    account.current_capital_cents -= amount.cents();
    Ok(())
}

fn single_write(account: CashAccount) -> CoreResult<Plan<CashAccount>> {
    let mut writes = WriteSet::new();
    writes.put(&account)?;
    Ok(Plan::new(writes, account))
}

/// Adds capital to the drawer.
pub fn plan_contribute(
    snapshot: &Snapshot,
    amount: Money,
    now: DateTime<Utc>,
) -> CoreResult<Plan<CashAccount>> {
    validate_amount_cents("amount", amount.cents())?;

    let mut account = load_cash_account(snapshot, now)?;
    account.current_capital_cents += amount.cents();
    account.initial_capital_cents += amount.cents();
    account.updated_at = now;
    single_write(account)
}

/// Sets the opening capital.
///
/// Fails with `AlreadyInitialized` when the account already holds money,
/// unless `force` asks for an explicit reset.
pub fn plan_set_initial(
    snapshot: &Snapshot,
    amount: Money,
    force: bool,
    now: DateTime<Utc>,
) -> CoreResult<Plan<CashAccount>> {
    validate_amount_cents("amount", amount.cents())?;

    let mut account = load_cash_account(snapshot, now)?;
    if account.is_initialized() && !force {
        return Err(CoreError::AlreadyInitialized);
    }

    account.initial_capital_cents = amount.cents();
    account.current_capital_cents = amount.cents();
    account.total_profit_cents = 0;
    account.updated_at = now;
    single_write(account)
}

/// Takes money out of the drawer against profit or capital.
pub fn plan_withdraw(
    snapshot: &Snapshot,
    amount: Money,
    source: WithdrawSource,
    now: DateTime<Utc>,
) -> CoreResult<Plan<CashAccount>> {
    validate_amount_cents("amount", amount.cents())?;

    let mut account = load_cash_account(snapshot, now)?;
    debit(&mut account, amount, Some(source))?;
    account.updated_at = now;
    single_write(account)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{with_absent, with_doc};

    fn snapshot_of(initial: i64, current: i64, profit: i64) -> Snapshot {
        let account = CashAccount {
            initial_capital_cents: initial,
            current_capital_cents: current,
            total_profit_cents: profit,
            ..CashAccount::empty(Utc::now())
        };
        let mut snapshot = Snapshot::new();
        with_doc(&mut snapshot, &account);
        snapshot
    }

    fn cents(account: &CashAccount) -> (i64, i64, i64) {
        (
            account.initial_capital_cents,
            account.current_capital_cents,
            account.total_profit_cents,
        )
    }

    #[test]
    fn test_contribute_creates_missing_account() {
        let mut snapshot = Snapshot::new();
        with_absent::<CashAccount>(&mut snapshot, CASH_ACCOUNT_ID);

        let plan = plan_contribute(&snapshot, Money::from_cents(5000), Utc::now()).unwrap();
        assert_eq!(cents(&plan.value), (5000, 5000, 0));
        assert_eq!(plan.value.id, CASH_ACCOUNT_ID);
    }

    #[test]
    fn test_set_initial_only_once_unless_forced() {
        let mut snapshot = Snapshot::new();
        with_absent::<CashAccount>(&mut snapshot, CASH_ACCOUNT_ID);
        let plan = plan_set_initial(&snapshot, Money::from_cents(1000), false, Utc::now()).unwrap();
        assert_eq!(cents(&plan.value), (1000, 1000, 0));

        let snapshot = snapshot_of(1000, 1500, 500);
        assert_eq!(
            plan_set_initial(&snapshot, Money::from_cents(2000), false, Utc::now()).unwrap_err(),
            CoreError::AlreadyInitialized
        );
        let plan = plan_set_initial(&snapshot, Money::from_cents(2000), true, Utc::now()).unwrap();
        assert_eq!(cents(&plan.value), (2000, 2000, 0));

        // A zeroed stored account counts as uninitialized.
        let snapshot = snapshot_of(0, 0, 0);
        assert!(plan_set_initial(&snapshot, Money::from_cents(10), false, Utc::now()).is_ok());
    }

    #[test]
    fn test_withdraw_profit_limited_by_profit() {
        let snapshot = snapshot_of(1000, 1300, 300);

        let err =
            plan_withdraw(&snapshot, Money::from_cents(400), WithdrawSource::Profit, Utc::now())
                .unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientFunds {
                source_name: "profit".to_string(),
                available_cents: 300,
                requested_cents: 400
            }
        );

        let plan =
            plan_withdraw(&snapshot, Money::from_cents(300), WithdrawSource::Profit, Utc::now())
                .unwrap();
        assert_eq!(cents(&plan.value), (1000, 1000, 0));
    }

    #[test]
    fn test_withdraw_capital() {
        let snapshot = snapshot_of(1000, 1300, 300);
        let plan =
            plan_withdraw(&snapshot, Money::from_cents(600), WithdrawSource::Capital, Utc::now())
                .unwrap();
        assert_eq!(cents(&plan.value), (400, 700, 300));

        let err =
            plan_withdraw(&snapshot, Money::from_cents(1100), WithdrawSource::Capital, Utc::now())
                .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
    }

    #[test]
    fn test_withdraw_limited_by_current_capital() {
        let snapshot = snapshot_of(1000, 200, 900);
        let err =
            plan_withdraw(&snapshot, Money::from_cents(300), WithdrawSource::Profit, Utc::now())
                .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientFunds { ref source_name, .. } if source_name == "current capital"
        ));
    }

    #[test]
    fn test_amounts_must_be_positive() {
        let snapshot = snapshot_of(0, 0, 0);
        assert!(plan_contribute(&snapshot, Money::zero(), Utc::now())
            .unwrap_err()
            .is_validation());
        assert!(
            plan_withdraw(&snapshot, Money::from_cents(-1), WithdrawSource::Capital, Utc::now())
                .unwrap_err()
                .is_validation()
        );
    }
}
