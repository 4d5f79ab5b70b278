//! # Sale Transaction Builder
//!
//! Turns a cart into one atomic write set.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleRequest::validate()     cart non-empty, client selected           │
//! │        │                                                                │
//! │        ▼  (inside the transaction, on fresh reads)                     │
//! │  for each line: qty ≤ on hand, else InsufficientStock                  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  subtotal = Σ price × qty                                              │
//! │  utility  = subtotal − round(Σ cost × qty)                             │
//! │        │                                                                │
//! │        ├── Cash:   capital += subtotal, profit += max(utility, 0)      │
//! │        └── Credit: Receivable { balance = subtotal,                    │
//! │                                 deferred = utility, Open }             │
//! │                    client.debt += subtotal                             │
//! │                                                                         │
//! │  Writes: items (stock out) + Sale + (cash account | receivable+client) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{Plan, ReadSet, Snapshot, WriteSet};
use crate::error::{CoreError, CoreResult};
use crate::ledger::inventory::{apply_stock_movement, StockMovement};
use crate::ledger::load_cash_account;
use crate::money::Money;
use crate::types::{
    CashAccount, Client, InventoryItem, Receivable, Sale, SaleLine, SaleType, SettlementStatus,
};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::CASH_ACCOUNT_ID;

// =============================================================================
// Request
// =============================================================================

/// A cart line as submitted at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub code: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(code: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            code: code.into(),
            quantity,
        }
    }
}

/// Everything checkout needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRequest {
    pub client_id: Option<String>,
    pub sale_type: SaleType,
    pub lines: Vec<CartLine>,
}

impl SaleRequest {
    /// Shape checks that need no store access.
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::invalid_sale("cart is empty"));
        }
        if self.client().is_none() {
            return Err(CoreError::invalid_sale("no client selected"));
        }
        validate_cart_size(self.lines.len())?;
        for line in &self.lines {
            if line.code.trim().is_empty() {
                return Err(CoreError::invalid_sale("cart line without item code"));
            }
            validate_quantity(line.quantity)?;
        }
        Ok(())
    }

    /// Selected client id, if any.
    pub fn client(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Lines with repeated codes merged, in first-seen order.
    pub fn merged_lines(&self) -> Vec<CartLine> {
        let mut merged: Vec<CartLine> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let code = line.code.trim();
            match merged.iter_mut().find(|m| m.code == code) {
                Some(existing) => existing.quantity += line.quantity,
                None => merged.push(CartLine::new(code, line.quantity)),
            }
        }
        merged
    }

    /// Items, client and cash account.
    pub fn read_set(&self) -> ReadSet {
        let mut reads = ReadSet::new().doc::<CashAccount>(CASH_ACCOUNT_ID);
        if let Some(client_id) = self.client() {
            reads = reads.doc::<Client>(client_id);
        }
        for line in self.merged_lines() {
            reads = reads.doc::<InventoryItem>(line.code);
        }
        reads
    }
}

/// Ids minted before the transaction, so every retry reuses them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleIds {
    pub sale_id: String,
    pub receivable_id: String,
}

// =============================================================================
// Plan
// =============================================================================

/// Plans a checkout. Returns the Sale that will be stored.
pub fn plan_sale(
    snapshot: &Snapshot,
    request: &SaleRequest,
    ids: &SaleIds,
    now: DateTime<Utc>,
) -> CoreResult<Plan<Sale>> {
    request.validate()?;
    let client_id = request
        .client()
        .ok_or_else(|| CoreError::invalid_sale("no client selected"))?;
    let mut client: Client = snapshot.require(client_id)?;

    let mut writes = WriteSet::new();
    let mut lines = Vec::new();
    let mut subtotal = Money::zero();
    let mut total_cost = Decimal::ZERO;

    for cart_line in request.merged_lines() {
        let item: InventoryItem = snapshot.require(&cart_line.code)?;
        if cart_line.quantity > item.quantity_on_hand {
            return Err(CoreError::InsufficientStock {
                code: item.code.clone(),
                available: item.quantity_on_hand,
                requested: cart_line.quantity,
            });
        }

        let line = SaleLine {
            code: item.code.clone(),
            description: item.description.clone(),
            quantity: cart_line.quantity,
            unit_price_cents: item.sale_price_cents,
            unit_cost_cents: item.unit_cost_cents,
        };
        subtotal += line.line_total();
        total_cost += line.line_cost();

        let updated = apply_stock_movement(&item, &StockMovement::consume(line.quantity), now)?;
        writes.put(&updated)?;
        lines.push(line);
    }

    let total_cost = Money::from_decimal_cents(total_cost);
    let utility = subtotal - total_cost;

    let receivable_id = match request.sale_type {
        SaleType::Cash => {
            let mut account = load_cash_account(snapshot, now)?;
            account.current_capital_cents += subtotal.cents();
            // A sale below cost is recorded on the Sale but never books a
            // negative profit.
            account.total_profit_cents += utility.cents().max(0);
            account.updated_at = now;
            writes.put(&account)?;
            None
        }
        SaleType::Credit => {
            let receivable = Receivable {
                id: ids.receivable_id.clone(),
                client_id: client.id.clone(),
                sale_id: ids.sale_id.clone(),
                original_amount_cents: subtotal.cents(),
                current_balance_cents: subtotal.cents(),
                deferred_utility_cents: utility.cents(),
                status: SettlementStatus::Open,
                payments: Vec::new(),
                created_at: now,
                settled_at: None,
            };
            writes.put(&receivable)?;

            client.current_debt_cents += subtotal.cents();
            client.updated_at = now;
            writes.put(&client)?;
            Some(receivable.id)
        }
    };

    let sale = Sale {
        id: ids.sale_id.clone(),
        client_id: client.id.clone(),
        sale_type: request.sale_type,
        items: lines,
        subtotal_cents: subtotal.cents(),
        total_cost_cents: total_cost.cents(),
        total_utility_cents: utility.cents(),
        receivable_id,
        created_at: now,
    };
    writes.put(&sale)?;

    Ok(Plan::new(writes, sale))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocKey;
    use crate::ledger::testing::{with_absent, with_doc};
    use crate::money::MarginRate;

    fn ids() -> SaleIds {
        SaleIds {
            sale_id: "s-1".to_string(),
            receivable_id: "r-1".to_string(),
        }
    }

    fn stocked(code: &str, qty: i64, cost: i64, margin_bps: u32) -> InventoryItem {
        let now = Utc::now();
        let item = InventoryItem::new(code, "Thing", MarginRate::from_bps(margin_bps), now);
        apply_stock_movement(&item, &StockMovement::restock(qty, Decimal::from(cost)), now)
            .unwrap()
    }

    fn snapshot(items: &[InventoryItem], account: Option<&CashAccount>) -> Snapshot {
        let mut snapshot = Snapshot::new();
        with_doc(&mut snapshot, &Client::new("c1", "Ana", Utc::now()));
        for item in items {
            with_doc(&mut snapshot, item);
        }
        match account {
            Some(account) => with_doc(&mut snapshot, account),
            None => with_absent::<CashAccount>(&mut snapshot, CASH_ACCOUNT_ID),
        }
        snapshot
    }

    fn request(sale_type: SaleType, lines: Vec<CartLine>) -> SaleRequest {
        SaleRequest {
            client_id: Some("c1".to_string()),
            sale_type,
            lines,
        }
    }

    #[test]
    fn test_validate_rejects_empty_cart_and_missing_client() {
        let empty = request(SaleType::Cash, vec![]);
        assert!(matches!(
            empty.validate(),
            Err(CoreError::InvalidSaleRequest { .. })
        ));

        let mut no_client = request(SaleType::Cash, vec![CartLine::new("A", 1)]);
        no_client.client_id = Some("  ".to_string());
        assert!(matches!(
            no_client.validate(),
            Err(CoreError::InvalidSaleRequest { .. })
        ));

        let bad_qty = request(SaleType::Cash, vec![CartLine::new("A", 0)]);
        assert!(bad_qty.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_merged_lines_and_read_set() {
        let req = request(
            SaleType::Cash,
            vec![
                CartLine::new("A", 1),
                CartLine::new("B", 2),
                CartLine::new("A", 3),
            ],
        );
        assert_eq!(
            req.merged_lines(),
            vec![CartLine::new("A", 4), CartLine::new("B", 2)]
        );

        let keys: Vec<String> = req.read_set().keys().map(|k| k.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "inventory/A",
                "inventory/B",
                "clients/c1",
                "cash_account/main"
            ]
        );
    }

    #[test]
    fn test_cash_sale_credits_capital_and_profit() {
        // 2 × 130 (cost 100) + 1 × 260 (cost 200)
        let a = stocked("A", 10, 100, 3000);
        let b = stocked("B", 5, 200, 3000);
        let mut account = CashAccount::empty(Utc::now());
        account.current_capital_cents = 1000;
        let snap = snapshot(&[a, b], Some(&account));

        let req = request(
            SaleType::Cash,
            vec![CartLine::new("A", 2), CartLine::new("B", 1)],
        );
        let plan = plan_sale(&snap, &req, &ids(), Utc::now()).unwrap();
        let sale = &plan.value;

        assert_eq!(sale.subtotal_cents, 520);
        assert_eq!(sale.total_cost_cents, 400);
        assert_eq!(sale.total_utility_cents, 120);
        assert_eq!(sale.receivable_id, None);

        let after = crate::ledger::testing::apply(&snap, &plan.writes);
        let account: CashAccount = after.require(CASH_ACCOUNT_ID).unwrap();
        assert_eq!(account.current_capital_cents, 1520);
        assert_eq!(account.total_profit_cents, 120);
        let a: InventoryItem = after.require("A").unwrap();
        assert_eq!(a.quantity_on_hand, 8);
        assert_eq!(a.total_cost_cents, Decimal::from(800));
        assert!(plan.writes.contains(&DocKey::of::<Sale>("s-1")));
    }

    #[test]
    fn test_cash_sale_below_cost_keeps_profit_non_negative() {
        // Cost 100.5 at 0% margin prices at 100 (half to even); two units
        // cost 201 against a subtotal of 200.
        let now = Utc::now();
        let item = InventoryItem::new("A", "Thing", MarginRate::from_bps(0), now);
        let restock = StockMovement::restock(4, Decimal::new(1005, 1));
        let a = apply_stock_movement(&item, &restock, now).unwrap();
        assert_eq!(a.sale_price_cents, 100);
        let snap = snapshot(&[a], Some(&CashAccount::empty(now)));

        let req = request(SaleType::Cash, vec![CartLine::new("A", 2)]);
        let plan = plan_sale(&snap, &req, &ids(), now).unwrap();
        assert_eq!(plan.value.subtotal_cents, 200);
        assert_eq!(plan.value.total_cost_cents, 201);
        assert_eq!(plan.value.total_utility_cents, -1);

        let after = crate::ledger::testing::apply(&snap, &plan.writes);
        let account: CashAccount = after.require(CASH_ACCOUNT_ID).unwrap();
        assert_eq!(account.current_capital_cents, 200);
        assert_eq!(account.total_profit_cents, 0);
    }

    #[test]
    fn test_credit_sale_defers_profit() {
        // subtotal 100, cost 70 → utility 30
        let a = stocked("A", 10, 70, 4286);
        let snap = snapshot(&[a], None);

        let req = request(SaleType::Credit, vec![CartLine::new("A", 1)]);
        let plan = plan_sale(&snap, &req, &ids(), Utc::now()).unwrap();
        assert_eq!(plan.value.subtotal_cents, 100);
        assert_eq!(plan.value.total_utility_cents, 30);
        assert_eq!(plan.value.receivable_id.as_deref(), Some("r-1"));

        let after = crate::ledger::testing::apply(&snap, &plan.writes);
        let receivable: Receivable = after.require("r-1").unwrap();
        assert_eq!(receivable.current_balance_cents, 100);
        assert_eq!(receivable.deferred_utility_cents, 30);
        assert_eq!(receivable.status, SettlementStatus::Open);
        assert_eq!(receivable.sale_id, "s-1");

        let client: Client = after.require("c1").unwrap();
        assert_eq!(client.current_debt_cents, 100);

        // No cash account write for credit sales.
        assert!(!plan
            .writes
            .contains(&DocKey::of::<CashAccount>(CASH_ACCOUNT_ID)));
    }

    #[test]
    fn test_insufficient_stock_uses_fresh_values() {
        let a = stocked("A", 3, 100, 0);
        let snap = snapshot(&[a], None);

        let req = request(
            SaleType::Cash,
            vec![CartLine::new("A", 2), CartLine::new("A", 2)],
        );
        let err = plan_sale(&snap, &req, &ids(), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                code: "A".to_string(),
                available: 3,
                requested: 4
            }
        );
    }

    #[test]
    fn test_unknown_client_or_item() {
        let snap = snapshot(&[], None);
        let mut req = request(SaleType::Credit, vec![CartLine::new("A", 1)]);
        // Item key was never read.
        assert!(matches!(
            plan_sale(&snap, &req, &ids(), Utc::now()),
            Err(CoreError::NotInReadSet { .. })
        ));

        req.client_id = Some("ghost".to_string());
        let mut snap = Snapshot::new();
        with_absent::<Client>(&mut snap, "ghost");
        assert!(matches!(
            plan_sale(&snap, &req, &ids(), Utc::now()),
            Err(CoreError::NotFound { .. })
        ));
    }
}
