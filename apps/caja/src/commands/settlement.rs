//! # Settlement Commands
//!
//! Payables and abonos (partial or total payments) on receivables and
//! payables.
//!
//! | Command          | Cash            | Profit                       | Other             |
//! |------------------|-----------------|------------------------------|-------------------|
//! | `pay_receivable` | + amount        | + deferred, once, on settle  | client debt −     |
//! | `pay_payable`    | − amount        | − amount if source = profit  | initial − if capital |

use caja_core::ledger::{NewPayable, PaymentOutcome, PaymentRequest};
use caja_core::{Money, Payable, Receivable, WithdrawSource};
use caja_db::{LedgerEngine, LedgerStore};
use tracing::debug;

use super::complete;
use crate::error::ApiError;
use crate::state::{Action, SharedState};

pub async fn record_payable<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    provider: &str,
    concept: &str,
    amount_cents: i64,
) -> Result<Payable, ApiError> {
    debug!(provider, amount = amount_cents, "record_payable command");
    let result = engine
        .record_payable(NewPayable {
            provider: provider.to_string(),
            concept: concept.to_string(),
            amount: Money::from_cents(amount_cents),
        })
        .await;
    complete(state, result, |payable| Action::PayableRecorded(payable.clone()))
}

/// Applies a client's payment to one of their receivables.
pub async fn pay_receivable<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    receivable_id: &str,
    amount_cents: i64,
) -> Result<PaymentOutcome, ApiError> {
    debug!(receivable_id, amount = amount_cents, "pay_receivable command");
    let request = PaymentRequest::receivable(receivable_id, Money::from_cents(amount_cents));
    let result = engine.apply_payment(request).await;
    complete(state, result, |outcome| Action::PaymentApplied(outcome.clone()))
}

/// Pays a provider from the drawer.
///
/// `source` additionally books the payment against profit or initial
/// capital; `None` only reduces current capital.
pub async fn pay_payable<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    payable_id: &str,
    amount_cents: i64,
    source: Option<WithdrawSource>,
) -> Result<PaymentOutcome, ApiError> {
    debug!(payable_id, amount = amount_cents, ?source, "pay_payable command");
    let request = PaymentRequest::payable(payable_id, Money::from_cents(amount_cents), source);
    let result = engine.apply_payment(request).await;
    complete(state, result, |outcome| Action::PaymentApplied(outcome.clone()))
}

pub async fn refresh_receivables<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<Vec<Receivable>, ApiError> {
    let result = engine.receivables().await;
    complete(state, result, |records| {
        Action::ReceivablesLoaded(records.clone())
    })
}

pub async fn refresh_payables<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<Vec<Payable>, ApiError> {
    let result = engine.payables().await;
    complete(state, result, |records| Action::PayablesLoaded(records.clone()))
}
