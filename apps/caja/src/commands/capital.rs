//! # Capital Commands
//!
//! Cash account movements outside of sales and payments.
//!
//! ```text
//! ┌────────────────────┬──────────────┬──────────────┬──────────────┐
//! │ Command            │ initial      │ current      │ profit       │
//! ├────────────────────┼──────────────┼──────────────┼──────────────┤
//! │ contribute(x)      │ + x          │ + x          │              │
//! │ withdraw(x, profit)│              │ − x          │ − x (≤ prof) │
//! │ withdraw(x, capit.)│ − x (≤ init) │ − x          │              │
//! │ set_initial(x)     │ = x          │ = x          │ = 0          │
//! └────────────────────┴──────────────┴──────────────┴──────────────┘
//! ```

use caja_core::{CashAccount, Money, WithdrawSource};
use caja_db::{LedgerEngine, LedgerStore};
use tracing::debug;

use super::complete;
use crate::error::ApiError;
use crate::state::{Action, SharedState};

pub async fn contribute<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    amount_cents: i64,
) -> Result<CashAccount, ApiError> {
    debug!(amount = amount_cents, "contribute command");
    let result = engine.contribute(Money::from_cents(amount_cents)).await;
    complete(state, result, |account| Action::CapitalChanged(account.clone()))
}

pub async fn withdraw<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    amount_cents: i64,
    source: WithdrawSource,
) -> Result<CashAccount, ApiError> {
    debug!(amount = amount_cents, source = source.as_str(), "withdraw command");
    let result = engine.withdraw(Money::from_cents(amount_cents), source).await;
    complete(state, result, |account| Action::CapitalChanged(account.clone()))
}

/// Sets the opening capital. Fails once the account holds money unless
/// `force` is set.
pub async fn set_initial_capital<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    amount_cents: i64,
    force: bool,
) -> Result<CashAccount, ApiError> {
    debug!(amount = amount_cents, force, "set_initial_capital command");
    let result = engine
        .set_initial_capital(Money::from_cents(amount_cents), force)
        .await;
    complete(state, result, |account| Action::CapitalChanged(account.clone()))
}

pub async fn refresh_cash<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<CashAccount, ApiError> {
    let result = engine.cash_account().await;
    complete(state, result, |account| Action::CashLoaded(account.clone()))
}
