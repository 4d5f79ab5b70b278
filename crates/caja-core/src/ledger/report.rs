//! # Ledger Reports
//!
//! Read-only views over one consistent snapshot of every collection:
//! an audit of the cross-record invariants and a summary of totals.
//!
//! ## Audited Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  client.current_debt == Σ balance of the client's open receivables     │
//! │  |qty × unit_cost − total_cost| ≤ 1e-6 cents, qty ≥ 0                  │
//! │  cash account: initial, current, profit ≥ 0                            │
//! │  settled receivable / payable: balance == 0                            │
//! │  receivable.client_id names an existing client                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{Collection, ReadSet, Snapshot};
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{
    CashAccount, Client, InventoryItem, Payable, Receivable, RecordKind, Sale, SettlementStatus,
};
use crate::CASH_ACCOUNT_ID;

/// Largest tolerated `|qty × unit − total|`, in cents.
pub fn valuation_tolerance() -> Decimal {
    Decimal::new(1, 6)
}

/// Scans of every collection.
pub fn audit_reads() -> ReadSet {
    Collection::ALL
        .into_iter()
        .fold(ReadSet::new(), |reads, collection| reads.scan(collection))
}

// =============================================================================
// Audit
// =============================================================================

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditFinding {
    ClientDebtMismatch {
        client_id: String,
        recorded_cents: i64,
        expected_cents: i64,
    },
    ValuationDrift {
        code: String,
        /// Decimal drift in cents, as text.
        drift: String,
    },
    NegativeStock {
        code: String,
        quantity: i64,
    },
    NegativeCashField {
        field: String,
        cents: i64,
    },
    SettledWithResidual {
        record: RecordKind,
        id: String,
        balance_cents: i64,
    },
    OrphanReceivable {
        id: String,
        client_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AuditReport {
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Checks every cross-record invariant.
pub fn audit(snapshot: &Snapshot) -> CoreResult<AuditReport> {
    let mut findings = Vec::new();

    let clients = snapshot.scan::<Client>()?;
    let receivables = snapshot.scan::<Receivable>()?;

    let mut open_by_client: BTreeMap<&str, i64> = BTreeMap::new();
    for receivable in &receivables {
        if !receivable.status.is_settled() {
            *open_by_client.entry(receivable.client_id.as_str()).or_default() +=
                receivable.current_balance_cents;
        }
        if !clients.iter().any(|c| c.id == receivable.client_id) {
            findings.push(AuditFinding::OrphanReceivable {
                id: receivable.id.clone(),
                client_id: receivable.client_id.clone(),
            });
        }
        if receivable.status.is_settled() && receivable.current_balance_cents != 0 {
            findings.push(AuditFinding::SettledWithResidual {
                record: RecordKind::Receivable,
                id: receivable.id.clone(),
                balance_cents: receivable.current_balance_cents,
            });
        }
    }

    for client in &clients {
        let expected = open_by_client.get(client.id.as_str()).copied().unwrap_or(0);
        if client.current_debt_cents != expected {
            findings.push(AuditFinding::ClientDebtMismatch {
                client_id: client.id.clone(),
                recorded_cents: client.current_debt_cents,
                expected_cents: expected,
            });
        }
    }

    for item in snapshot.scan::<InventoryItem>()? {
        if item.quantity_on_hand < 0 {
            findings.push(AuditFinding::NegativeStock {
                code: item.code.clone(),
                quantity: item.quantity_on_hand,
            });
        }
        let drift = item.valuation_drift();
        if drift > valuation_tolerance() {
            findings.push(AuditFinding::ValuationDrift {
                code: item.code.clone(),
                drift: drift.to_string(),
            });
        }
    }

    for payable in snapshot.scan::<Payable>()? {
        if payable.status.is_settled() && payable.current_balance_cents != 0 {
            findings.push(AuditFinding::SettledWithResidual {
                record: RecordKind::Payable,
                id: payable.id.clone(),
                balance_cents: payable.current_balance_cents,
            });
        }
    }

    if let Some(account) = snapshot.get::<CashAccount>(CASH_ACCOUNT_ID)? {
        for (field, cents) in [
            ("initial_capital", account.initial_capital_cents),
            ("current_capital", account.current_capital_cents),
            ("total_profit", account.total_profit_cents),
        ] {
            if cents < 0 {
                findings.push(AuditFinding::NegativeCashField {
                    field: field.to_string(),
                    cents,
                });
            }
        }
    }

    Ok(AuditReport { findings })
}

// =============================================================================
// Summary
// =============================================================================

/// Counts and totals across the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerSummary {
    pub item_count: usize,
    pub units_on_hand: i64,
    pub stock_value: Money,
    pub client_count: usize,
    pub client_debt: Money,
    pub sale_count: usize,
    pub sales_total: Money,
    pub open_receivables: usize,
    pub receivables_outstanding: Money,
    pub deferred_profit: Money,
    pub open_payables: usize,
    pub payables_outstanding: Money,
    pub initial_capital: Money,
    pub current_capital: Money,
    pub total_profit: Money,
}

/// Totals over a snapshot taken with [`audit_reads`].
pub fn summarize(snapshot: &Snapshot) -> CoreResult<LedgerSummary> {
    let mut summary = LedgerSummary::default();

    let items = snapshot.scan::<InventoryItem>()?;
    summary.item_count = items.len();
    summary.units_on_hand = items.iter().map(|i| i.quantity_on_hand).sum();
    summary.stock_value =
        Money::from_decimal_cents(items.iter().map(|i| i.total_cost_cents).sum());

    let clients = snapshot.scan::<Client>()?;
    summary.client_count = clients.len();
    summary.client_debt = clients.iter().map(Client::current_debt).sum();

    let sales = snapshot.scan::<Sale>()?;
    summary.sale_count = sales.len();
    summary.sales_total = sales.iter().map(Sale::subtotal).sum();

    for receivable in snapshot.scan::<Receivable>()? {
        if receivable.status != SettlementStatus::Settled {
            summary.open_receivables += 1;
            summary.receivables_outstanding += receivable.current_balance();
            summary.deferred_profit += Money::from_cents(receivable.deferred_utility_cents);
        }
    }

    for payable in snapshot.scan::<Payable>()? {
        if payable.status != SettlementStatus::Settled {
            summary.open_payables += 1;
            summary.payables_outstanding += payable.current_balance();
        }
    }

    if let Some(account) = snapshot.get::<CashAccount>(CASH_ACCOUNT_ID)? {
        summary.initial_capital = account.initial_capital();
        summary.current_capital = account.current_capital();
        summary.total_profit = account.total_profit();
    }

    Ok(summary)
}
