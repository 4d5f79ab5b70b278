//! # Ledger Module
//!
//! Every ledger transition as a pure planning function.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  inventory   apply_stock_movement, register / update items             │
//! │  sale        cart → stock out, Sale, cash or receivable + client debt  │
//! │  settlement  abonos on receivables and payables                        │
//! │  capital     contribute, set initial, withdraw                         │
//! │  clients     register clients                                          │
//! │  maintenance reset of sales, receivables, payables and debts           │
//! │  report      audit findings and ledger summary (read-only)             │
//! │                                                                         │
//! │  Each module exposes `xxx_reads(..) -> ReadSet` and                    │
//! │  `plan_xxx(&Snapshot, .., now) -> CoreResult<Plan<T>>`.                │
//! │  Components never call each other through the store; they share       │
//! │  only the pure helpers below.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod capital;
pub mod clients;
pub mod inventory;
pub mod maintenance;
pub mod report;
pub mod sale;
pub mod settlement;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::Snapshot;
use crate::error::CoreResult;
use crate::money::Money;
use crate::types::CashAccount;
use crate::CASH_ACCOUNT_ID;

pub use capital::{cash_account_reads, plan_contribute, plan_set_initial, plan_withdraw};
pub use clients::{client_reads, plan_register_client};
pub use inventory::{
    apply_stock_movement, item_reads, plan_register_item, plan_stock_movement,
    plan_update_details, ItemDetailsUpdate, NewItem, StockMovement,
};
pub use maintenance::{plan_reset, reset_reads, ResetSummary};
pub use report::{audit, audit_reads, summarize, AuditFinding, AuditReport, LedgerSummary};
pub use sale::{plan_sale, CartLine, SaleIds, SaleRequest};
pub use settlement::{
    payable_reads, plan_new_payable, plan_payment, receivable_reads, NewPayable,
    PaymentOutcome, PaymentRequest,
};

// =============================================================================
// Settlement Policy
// =============================================================================

/// Tolerances applied when settling receivables and payables.
///
/// ## Defaults
/// - `overpay_tolerance`: 1 cent. A payment may exceed the balance by this
///   much (rounding on the payer's side).
/// - `settle_threshold`: 10 cents. A balance at or below this after a
///   payment is written off and the record settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementPolicy {
    pub overpay_tolerance: Money,
    pub settle_threshold: Money,
}

impl SettlementPolicy {
    pub const fn new(overpay_tolerance: Money, settle_threshold: Money) -> Self {
        SettlementPolicy {
            overpay_tolerance,
            settle_threshold,
        }
    }

    /// Exact settlement: no overpay, no write-off.
    pub const fn exact() -> Self {
        SettlementPolicy::new(Money::zero(), Money::zero())
    }
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        SettlementPolicy::new(Money::from_cents(1), Money::from_cents(10))
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// The cash account from a snapshot, or a zeroed one if it was never
/// created.
pub(crate) fn load_cash_account(snapshot: &Snapshot, now: DateTime<Utc>) -> CoreResult<CashAccount> {
    Ok(snapshot
        .get::<CashAccount>(CASH_ACCOUNT_ID)?
        .unwrap_or_else(|| CashAccount::empty(now)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Snapshot builders shared by the ledger tests.

    use crate::document::{encode, Collection, CollectionScan, Document, Snapshot, VersionedDoc};
    use std::collections::BTreeMap;

    /// Adds `doc` as a key read at version 1.
    pub fn with_doc<D: Document>(snapshot: &mut Snapshot, doc: &D) {
        snapshot.insert_doc(
            doc.key(),
            Some(VersionedDoc {
                version: 1,
                body: encode(doc).unwrap(),
            }),
        );
    }

    /// Adds an absent key read.
    pub fn with_absent<D: Document>(snapshot: &mut Snapshot, id: &str) {
        snapshot.insert_doc(crate::document::DocKey::of::<D>(id), None);
    }

    /// Adds a scan of `D`'s collection holding exactly `docs`.
    pub fn with_scan<D: Document>(snapshot: &mut Snapshot, docs: &[D]) {
        let mut map = BTreeMap::new();
        for doc in docs {
            map.insert(
                doc.doc_id().to_string(),
                VersionedDoc {
                    version: 1,
                    body: encode(doc).unwrap(),
                },
            );
        }
        snapshot.insert_scan(D::COLLECTION, CollectionScan { version: 1, docs: map });
    }

    /// Adds an empty scan.
    pub fn with_empty_scan(snapshot: &mut Snapshot, collection: Collection) {
        snapshot.insert_scan(collection, CollectionScan::default());
    }

    /// Applies a write set on top of a snapshot, as a store commit would.
    pub fn apply(snapshot: &Snapshot, writes: &crate::document::WriteSet) -> Snapshot {
        let mut next = snapshot.clone();
        for (key, body) in writes.iter() {
            next.insert_doc(
                key.clone(),
                body.map(|b| VersionedDoc {
                    version: 2,
                    body: b.clone(),
                }),
            );
        }
        next
    }
}
