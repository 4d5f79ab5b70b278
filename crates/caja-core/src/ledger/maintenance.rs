//! # Maintenance Reset
//!
//! Clears the transaction history of a tenant in one batch.
//!
//! ```text
//! Sales        ── deleted
//! Receivables  ── deleted
//! Payables     ── deleted
//! Clients      ── kept, current_debt = 0
//! Inventory    ── untouched
//! Cash account ── untouched
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{Collection, Plan, ReadSet, Snapshot, WriteSet};
use crate::error::CoreResult;
use crate::types::{Client, Payable, Receivable, Sale};

/// What a reset removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResetSummary {
    pub sales_deleted: usize,
    pub receivables_deleted: usize,
    pub payables_deleted: usize,
    pub clients_zeroed: usize,
}

/// Scans of the four collections a reset touches.
pub fn reset_reads() -> ReadSet {
    ReadSet::new()
        .scan(Collection::Sales)
        .scan(Collection::Receivables)
        .scan(Collection::Payables)
        .scan(Collection::Clients)
}

/// Plans the reset as one all-or-nothing write set.
pub fn plan_reset(snapshot: &Snapshot, now: DateTime<Utc>) -> CoreResult<Plan<ResetSummary>> {
    let mut writes = WriteSet::new();
    let mut summary = ResetSummary::default();

    for sale in snapshot.scan::<Sale>()? {
        writes.delete::<Sale>(sale.id);
        summary.sales_deleted += 1;
    }
    for receivable in snapshot.scan::<Receivable>()? {
        writes.delete::<Receivable>(receivable.id);
        summary.receivables_deleted += 1;
    }
    for payable in snapshot.scan::<Payable>()? {
        writes.delete::<Payable>(payable.id);
        summary.payables_deleted += 1;
    }
    for mut client in snapshot.scan::<Client>()? {
        if client.current_debt_cents != 0 {
            client.current_debt_cents = 0;
            client.updated_at = now;
            writes.put(&client)?;
            summary.clients_zeroed += 1;
        }
    }

    Ok(Plan::new(writes, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocKey;
    use crate::ledger::testing::{with_empty_scan, with_scan};
    use crate::types::{CashAccount, SaleType};

    fn sale(id: &str) -> Sale {
        Sale {
            id: id.to_string(),
            client_id: "c1".to_string(),
            sale_type: SaleType::Cash,
            items: Vec::new(),
            subtotal_cents: 100,
            total_cost_cents: 70,
            total_utility_cents: 30,
            receivable_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_reset_deletes_history_and_zeroes_debt() {
        let mut owing = Client::new("c1", "Ana", Utc::now());
        owing.current_debt_cents = 500;
        let clear = Client::new("c2", "Luis", Utc::now());

        let mut snapshot = Snapshot::new();
        with_scan(&mut snapshot, &[sale("s1"), sale("s2")]);
        with_empty_scan(&mut snapshot, Collection::Receivables);
        with_empty_scan(&mut snapshot, Collection::Payables);
        with_scan(&mut snapshot, &[owing, clear]);

        let plan = plan_reset(&snapshot, Utc::now()).unwrap();
        assert_eq!(
            plan.value,
            ResetSummary {
                sales_deleted: 2,
                receivables_deleted: 0,
                payables_deleted: 0,
                clients_zeroed: 1,
            }
        );

        let collections = plan.writes.collections();
        assert!(!collections.contains(&Collection::Inventory));
        assert!(!collections.contains(&Collection::CashAccount));
        assert!(plan.writes.contains(&DocKey::of::<Client>("c1")));
        assert!(!plan.writes.contains(&DocKey::of::<Client>("c2")));
        assert!(!plan.writes.contains(&DocKey::of::<CashAccount>("main")));
    }

    #[test]
    fn test_reset_requires_scans() {
        let snapshot = Snapshot::new();
        assert!(plan_reset(&snapshot, Utc::now()).is_err());
    }
}
