//! # Settlement Unit
//!
//! Payments ("abonos") against receivables and payables.
//!
//! ## Receivable Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  balance 100, deferred 30                                              │
//! │                                                                         │
//! │  pay 60 ──► balance 40, Partial     capital +60   profit +0    debt −60│
//! │  pay 40 ──► balance 0,  Settled     capital +40   profit +30   debt −40│
//! │  pay 1  ──► AlreadySettled (profit can only be realized once)          │
//! │                                                                         │
//! │  A balance ≤ settle_threshold after a payment is written off:          │
//! │  the record settles at 0 and the client's debt drops by the            │
//! │  residual too, so debt stays equal to Σ open balances.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Payable Payment
//! Capital goes down by the amount and never below zero. An optional
//! [`WithdrawSource`] also books the payout against profit or initial
//! capital.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{Plan, ReadSet, Snapshot, WriteSet};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::ledger::capital::debit;
use crate::ledger::{load_cash_account, SettlementPolicy};
use crate::money::Money;
use crate::types::{
    CashAccount, Client, Payable, PaymentEntry, Receivable, RecordKind, SettlementStatus,
    WithdrawSource,
};
use crate::validation::{validate_amount_cents, validate_payable_text};
use crate::CASH_ACCOUNT_ID;

// =============================================================================
// Request / Outcome
// =============================================================================

/// A payment to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub kind: RecordKind,
    pub record_id: String,
    pub amount: Money,
    /// Payables only.
    pub withdraw_source: Option<WithdrawSource>,
}

impl PaymentRequest {
    pub fn receivable(record_id: impl Into<String>, amount: Money) -> Self {
        PaymentRequest {
            kind: RecordKind::Receivable,
            record_id: record_id.into(),
            amount,
            withdraw_source: None,
        }
    }

    pub fn payable(
        record_id: impl Into<String>,
        amount: Money,
        withdraw_source: Option<WithdrawSource>,
    ) -> Self {
        PaymentRequest {
            kind: RecordKind::Payable,
            record_id: record_id.into(),
            amount,
            withdraw_source,
        }
    }

    /// Rejects non-positive amounts before any read.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.amount.is_positive() {
            return Err(CoreError::invalid_payment("amount must be greater than zero"));
        }
        if self.record_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "record_id".to_string(),
            }
            .into());
        }
        if self.kind == RecordKind::Receivable && self.withdraw_source.is_some() {
            return Err(ValidationError::InvalidFormat {
                field: "withdraw_source".to_string(),
                reason: "only payables draw from a source".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// What a payment did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentOutcome {
    pub kind: RecordKind,
    pub record_id: String,
    pub amount_cents: i64,
    pub new_balance_cents: i64,
    pub status: SettlementStatus,
    /// Residual balance written off on settlement.
    pub written_off_cents: i64,
    /// Deferred profit recognized by this payment.
    pub profit_realized_cents: i64,
}

struct Settlement {
    balance_after: Money,
    new_balance: Money,
    written_off: Money,
    status: SettlementStatus,
}

fn settle(balance: Money, amount: Money, policy: &SettlementPolicy) -> CoreResult<Settlement> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_payment("amount must be greater than zero"));
    }
    if amount > balance + policy.overpay_tolerance {
        return Err(CoreError::invalid_payment(format!(
            "{} exceeds the outstanding balance of {}",
            amount, balance
        )));
    }

    let balance_after = (balance - amount).clamp_non_negative();
    if balance_after <= policy.settle_threshold {
        Ok(Settlement {
            balance_after,
            new_balance: Money::zero(),
            written_off: balance_after,
            status: SettlementStatus::Settled,
        })
    } else {
        Ok(Settlement {
            balance_after,
            new_balance: balance_after,
            written_off: Money::zero(),
            status: SettlementStatus::Partial,
        })
    }
}

// =============================================================================
// Read Sets
// =============================================================================

/// Receivable, its client and the cash account.
///
/// The client id comes from a prior read of the receivable; the plan
/// verifies it.
pub fn receivable_reads(record_id: &str, client_id: &str) -> ReadSet {
    ReadSet::new()
        .doc::<Receivable>(record_id)
        .doc::<Client>(client_id)
        .doc::<CashAccount>(CASH_ACCOUNT_ID)
}

/// Payable and the cash account.
pub fn payable_reads(record_id: &str) -> ReadSet {
    ReadSet::new()
        .doc::<Payable>(record_id)
        .doc::<CashAccount>(CASH_ACCOUNT_ID)
}

// =============================================================================
// Plans
// =============================================================================

/// Applies a payment.
///
/// `expected_client_id` is the receivable's client as learned before the
/// transaction; it is ignored for payables.
pub fn plan_payment(
    snapshot: &Snapshot,
    request: &PaymentRequest,
    expected_client_id: Option<&str>,
    policy: &SettlementPolicy,
    now: DateTime<Utc>,
) -> CoreResult<Plan<PaymentOutcome>> {
    request.validate()?;
    match request.kind {
        RecordKind::Receivable => {
            plan_receivable_payment(snapshot, request, expected_client_id, policy, now)
        }
        RecordKind::Payable => plan_payable_payment(snapshot, request, policy, now),
    }
}

fn plan_receivable_payment(
    snapshot: &Snapshot,
    request: &PaymentRequest,
    expected_client_id: Option<&str>,
    policy: &SettlementPolicy,
    now: DateTime<Utc>,
) -> CoreResult<Plan<PaymentOutcome>> {
    let mut receivable: Receivable = snapshot.require(&request.record_id)?;
    if receivable.status.is_settled() {
        return Err(CoreError::AlreadySettled {
            entity: "Receivable".to_string(),
            id: receivable.id,
        });
    }
    if let Some(expected) = expected_client_id {
        if expected != receivable.client_id {
            return Err(CoreError::Inconsistent {
                reason: format!(
                    "receivable {} belongs to client {}, not {}",
                    receivable.id, receivable.client_id, expected
                ),
            });
        }
    }
    let mut client: Client = snapshot.require(&receivable.client_id)?;
    let mut account = load_cash_account(snapshot, now)?;

    let settlement = settle(receivable.current_balance(), request.amount, policy)?;

    let profit_realized = if settlement.status.is_settled() {
        receivable.deferred_utility_cents.max(0)
    } else {
        0
    };

    account.current_capital_cents += request.amount.cents();
    account.total_profit_cents += profit_realized;
    account.updated_at = now;

    // An overpay within tolerance lands in the drawer but only the balance
    // (plus any write-off) comes off the client's debt.
    let debt_reduction = receivable.current_balance() - settlement.new_balance;
    client.current_debt_cents = (client.current_debt() - debt_reduction)
        .clamp_non_negative()
        .cents();
    client.updated_at = now;

    receivable.current_balance_cents = settlement.new_balance.cents();
    receivable.status = settlement.status;
    receivable.payments.push(PaymentEntry {
        amount_cents: request.amount.cents(),
        balance_after_cents: settlement.balance_after.cents(),
        paid_at: now,
    });
    if settlement.status.is_settled() {
        receivable.settled_at = Some(now);
    }

    let mut writes = WriteSet::new();
    writes.put(&receivable)?;
    writes.put(&client)?;
    writes.put(&account)?;

    Ok(Plan::new(
        writes,
        PaymentOutcome {
            kind: RecordKind::Receivable,
            record_id: receivable.id,
            amount_cents: request.amount.cents(),
            new_balance_cents: settlement.new_balance.cents(),
            status: settlement.status,
            written_off_cents: settlement.written_off.cents(),
            profit_realized_cents: profit_realized,
        },
    ))
}

fn plan_payable_payment(
    snapshot: &Snapshot,
    request: &PaymentRequest,
    policy: &SettlementPolicy,
    now: DateTime<Utc>,
) -> CoreResult<Plan<PaymentOutcome>> {
    let mut payable: Payable = snapshot.require(&request.record_id)?;
    if payable.status.is_settled() {
        return Err(CoreError::AlreadySettled {
            entity: "Payable".to_string(),
            id: payable.id,
        });
    }
    let mut account = load_cash_account(snapshot, now)?;

    let settlement = settle(payable.current_balance(), request.amount, policy)?;
    debit(&mut account, request.amount, request.withdraw_source)?;
    account.updated_at = now;

    payable.current_balance_cents = settlement.new_balance.cents();
    payable.status = settlement.status;
    payable.payments.push(PaymentEntry {
        amount_cents: request.amount.cents(),
        balance_after_cents: settlement.balance_after.cents(),
        paid_at: now,
    });
    if settlement.status.is_settled() {
        payable.settled_at = Some(now);
    }

    let mut writes = WriteSet::new();
    writes.put(&payable)?;
    writes.put(&account)?;

    Ok(Plan::new(
        writes,
        PaymentOutcome {
            kind: RecordKind::Payable,
            record_id: payable.id,
            amount_cents: request.amount.cents(),
            new_balance_cents: settlement.new_balance.cents(),
            status: settlement.status,
            written_off_cents: settlement.written_off.cents(),
            profit_realized_cents: 0,
        },
    ))
}

/// Input for a new payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPayable {
    pub provider: String,
    pub concept: String,
    pub amount: Money,
}

impl NewPayable {
    pub fn validate(&self) -> CoreResult<()> {
        validate_payable_text(&self.provider, &self.concept)?;
        validate_amount_cents("amount", self.amount.cents())?;
        Ok(())
    }
}

/// Records an open payable under a pre-minted id.
pub fn plan_new_payable(
    snapshot: &Snapshot,
    id: &str,
    new_payable: &NewPayable,
    now: DateTime<Utc>,
) -> CoreResult<Plan<Payable>> {
    new_payable.validate()?;
    if snapshot.get::<Payable>(id)?.is_some() {
        return Err(CoreError::duplicate("Payable", id));
    }

    let payable = Payable {
        id: id.to_string(),
        provider: new_payable.provider.trim().to_string(),
        concept: new_payable.concept.trim().to_string(),
        original_amount_cents: new_payable.amount.cents(),
        current_balance_cents: new_payable.amount.cents(),
        status: SettlementStatus::Open,
        payments: Vec::new(),
        created_at: now,
        settled_at: None,
    };

    let mut writes = WriteSet::new();
    writes.put(&payable)?;
    Ok(Plan::new(writes, payable))
}

// =============================================================================
// Unit Tests
// =============================================================================
