//! # Inventory Valuation
//!
//! Moving-average cost and stock quantity per item.
//!
//! ## Movement Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  new_qty = qty + delta            (new_qty < 0 → NegativeStock)        │
//! │                                                                         │
//! │  delta > 0   total += delta × incoming_cost                            │
//! │              unit   = total / new_qty                                  │
//! │                                                                         │
//! │  delta < 0   total += delta × unit          (unit unchanged)           │
//! │              new_qty == 0 → total = 0                                  │
//! │                                                                         │
//! │  delta == 0  metadata edit; unit = cost override if given,             │
//! │              total = qty × unit                                        │
//! │                                                                         │
//! │  always      sale_price = round(unit × (1 + margin))                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Example: `+10 @ 2` → unit 2, stock 10; `+10 @ 4` → unit 3, stock 20;
//! sell 5 → stock 15, total 45.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::document::{Plan, ReadSet, Snapshot, WriteSet};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::MarginRate;
use crate::types::InventoryItem;
use crate::validation::{validate_description, validate_item_code, validate_margin_bps};

// =============================================================================
// Stock Movement
// =============================================================================

/// One change to an item's stock or valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Units in (positive) or out (negative).
    pub delta: i64,
    /// Unit cost of incoming units, in cents.
    pub incoming_unit_cost_cents: Decimal,
    /// New margin; `None` keeps the item's margin.
    pub margin: Option<MarginRate>,
    /// Explicit unit cost, honored only when `delta == 0`.
    pub cost_override_cents: Option<Decimal>,
}

impl StockMovement {
    /// `qty` units arriving at `unit_cost_cents` each.
    pub fn restock(qty: i64, unit_cost_cents: Decimal) -> Self {
        StockMovement {
            delta: qty,
            incoming_unit_cost_cents: unit_cost_cents,
            margin: None,
            cost_override_cents: None,
        }
    }

    /// `qty` units leaving at the current average cost.
    pub fn consume(qty: i64) -> Self {
        StockMovement {
            delta: -qty,
            incoming_unit_cost_cents: Decimal::ZERO,
            margin: None,
            cost_override_cents: None,
        }
    }

    /// No stock change; optionally new margin and unit cost.
    pub fn revalue(margin: Option<MarginRate>, cost_override_cents: Option<Decimal>) -> Self {
        StockMovement {
            delta: 0,
            incoming_unit_cost_cents: Decimal::ZERO,
            margin,
            cost_override_cents,
        }
    }

    pub fn with_margin(mut self, margin: MarginRate) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Rejects negative costs and out-of-range margins.
    pub fn validate(&self) -> CoreResult<()> {
        if self.incoming_unit_cost_cents.is_sign_negative()
            && !self.incoming_unit_cost_cents.is_zero()
        {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_cost".to_string(),
            }
            .into());
        }
        if let Some(cost) = self.cost_override_cents {
            if cost.is_sign_negative() && !cost.is_zero() {
                return Err(ValidationError::MustNotBeNegative {
                    field: "unit_cost".to_string(),
                }
                .into());
            }
        }
        if let Some(margin) = self.margin {
            validate_margin_bps(margin.bps())?;
        }
        Ok(())
    }
}

fn overflow(code: &str) -> CoreError {
    CoreError::Inconsistent {
        reason: format!("valuation of {code} overflowed"),
    }
}

/// Applies a movement to an item, returning the updated item.
///
/// ## Example
/// ```rust
/// use caja_core::ledger::{apply_stock_movement, StockMovement};
/// use caja_core::{InventoryItem, MarginRate};
/// use chrono::Utc;
/// use rust_decimal::Decimal;
///
/// let now = Utc::now();
/// let item = InventoryItem::new("A1", "Widget", MarginRate::from_bps(0), now);
/// let item = apply_stock_movement(&item, &StockMovement::restock(10, Decimal::from(2)), now).unwrap();
/// let item = apply_stock_movement(&item, &StockMovement::restock(10, Decimal::from(4)), now).unwrap();
/// assert_eq!(item.unit_cost_cents, Decimal::from(3));
/// assert_eq!(item.quantity_on_hand, 20);
/// ```
pub fn apply_stock_movement(
    item: &InventoryItem,
    movement: &StockMovement,
    now: DateTime<Utc>,
) -> CoreResult<InventoryItem> {
    movement.validate()?;

    let new_qty = item
        .quantity_on_hand
        .checked_add(movement.delta)
        .ok_or_else(|| overflow(&item.code))?;
    if new_qty < 0 {
        return Err(CoreError::NegativeStock {
            code: item.code.clone(),
            on_hand: item.quantity_on_hand,
            delta: movement.delta,
        });
    }

    let mut next = item.clone();
    let delta = Decimal::from(movement.delta);

    if movement.delta > 0 {
        let incoming = delta
            .checked_mul(movement.incoming_unit_cost_cents)
            .ok_or_else(|| overflow(&item.code))?;
        next.total_cost_cents = item
            .total_cost_cents
            .checked_add(incoming)
            .ok_or_else(|| overflow(&item.code))?;
        next.unit_cost_cents = next
            .total_cost_cents
            .checked_div(Decimal::from(new_qty))
            .ok_or_else(|| overflow(&item.code))?;
    } else if movement.delta < 0 {
        if new_qty == 0 {
            next.total_cost_cents = Decimal::ZERO;
        } else {
            let outgoing = delta
                .checked_mul(item.unit_cost_cents)
                .ok_or_else(|| overflow(&item.code))?;
            next.total_cost_cents = item
                .total_cost_cents
                .checked_add(outgoing)
                .ok_or_else(|| overflow(&item.code))?;
        }
    } else {
        if let Some(cost) = movement.cost_override_cents {
            next.unit_cost_cents = cost;
        } else if new_qty == 0 && !movement.incoming_unit_cost_cents.is_zero() {
            next.unit_cost_cents = movement.incoming_unit_cost_cents;
        }
        next.total_cost_cents = Decimal::from(new_qty)
            .checked_mul(next.unit_cost_cents)
            .ok_or_else(|| overflow(&item.code))?;
    }

    next.quantity_on_hand = new_qty;
    if let Some(margin) = movement.margin {
        next.margin_bps = margin.bps();
    }
    next.sale_price_cents = next.margin().sale_price(next.unit_cost_cents).cents();
    next.updated_at = now;

    Ok(next)
}

// =============================================================================
// Planned Operations
// =============================================================================

/// Reads needed by every single-item operation.
pub fn item_reads(code: &str) -> ReadSet {
    ReadSet::new().doc::<InventoryItem>(code)
}

/// Applies a movement to a stored item.
pub fn plan_stock_movement(
    snapshot: &Snapshot,
    code: &str,
    movement: &StockMovement,
    now: DateTime<Utc>,
) -> CoreResult<Plan<InventoryItem>> {
    let item: InventoryItem = snapshot.require(code)?;
    let updated = apply_stock_movement(&item, movement, now)?;

    let mut writes = WriteSet::new();
    writes.put(&updated)?;
    Ok(Plan::new(writes, updated))
}

/// Input for registering a new item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub code: String,
    pub description: String,
    pub margin_bps: u32,
    pub image_ref: Option<String>,
    pub initial_quantity: i64,
    pub initial_unit_cost_cents: Decimal,
}

impl NewItem {
    pub fn validate(&self) -> CoreResult<()> {
        validate_item_code(&self.code)?;
        validate_description(&self.description)?;
        validate_margin_bps(self.margin_bps)?;
        if self.initial_quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "initial_quantity".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Creates an item; its initial stock goes through the movement rules.
pub fn plan_register_item(
    snapshot: &Snapshot,
    new_item: &NewItem,
    now: DateTime<Utc>,
) -> CoreResult<Plan<InventoryItem>> {
    new_item.validate()?;

    let code = new_item.code.trim();
    if snapshot.get::<InventoryItem>(code)?.is_some() {
        return Err(CoreError::duplicate("Item", code));
    }

    let mut item = InventoryItem::new(
        code,
        new_item.description.trim(),
        MarginRate::from_bps(new_item.margin_bps),
        now,
    );
    item.image_ref = new_item.image_ref.clone();

    let movement = if new_item.initial_quantity > 0 {
        StockMovement::restock(new_item.initial_quantity, new_item.initial_unit_cost_cents)
    } else {
        StockMovement::revalue(None, Some(new_item.initial_unit_cost_cents))
    };
    let item = apply_stock_movement(&item, &movement, now)?;

    let mut writes = WriteSet::new();
    writes.put(&item)?;
    Ok(Plan::new(writes, item))
}

/// Metadata edits; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDetailsUpdate {
    pub description: Option<String>,
    /// `Some(None)` clears the image.
    pub image_ref: Option<Option<String>>,
}

/// Edits description and image reference. Valuation is untouched.
pub fn plan_update_details(
    snapshot: &Snapshot,
    code: &str,
    update: &ItemDetailsUpdate,
    now: DateTime<Utc>,
) -> CoreResult<Plan<InventoryItem>> {
    let mut item: InventoryItem = snapshot.require(code)?;

    if let Some(description) = &update.description {
        validate_description(description)?;
        item.description = description.trim().to_string();
    }
    if let Some(image_ref) = &update.image_ref {
        item.image_ref = image_ref.clone();
    }
    item.updated_at = now;

    let mut writes = WriteSet::new();
    writes.put(&item)?;
    Ok(Plan::new(writes, item))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{with_absent, with_doc};
    use proptest::prelude::*;

    fn item() -> InventoryItem {
        InventoryItem::new("A1", "Widget", MarginRate::from_bps(5000), Utc::now())
    }

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_moving_average_example() {
        let now = Utc::now();
        let item = item();

        let item = apply_stock_movement(&item, &StockMovement::restock(10, d(2)), now).unwrap();
        assert_eq!(item.unit_cost_cents, d(2));
        assert_eq!(item.quantity_on_hand, 10);

        let item = apply_stock_movement(&item, &StockMovement::restock(10, d(4)), now).unwrap();
        assert_eq!(item.unit_cost_cents, d(3));
        assert_eq!(item.quantity_on_hand, 20);

        let item = apply_stock_movement(&item, &StockMovement::consume(5), now).unwrap();
        assert_eq!(item.quantity_on_hand, 15);
        assert_eq!(item.total_cost_cents, d(45));
        assert_eq!(item.unit_cost_cents, d(3));
    }

    #[test]
    fn test_sale_price_follows_unit_cost() {
        let now = Utc::now();
        let item = apply_stock_movement(&item(), &StockMovement::restock(4, d(200)), now).unwrap();
        assert_eq!(item.sale_price_cents, 300);

        let item = apply_stock_movement(
            &item,
            &StockMovement::revalue(Some(MarginRate::from_bps(2500)), None),
            now,
        )
        .unwrap();
        assert_eq!(item.sale_price_cents, 250);
        assert_eq!(item.quantity_on_hand, 4);
    }

    #[test]
    fn test_negative_stock_rejected() {
        let now = Utc::now();
        let item = apply_stock_movement(&item(), &StockMovement::restock(3, d(10)), now).unwrap();
        let err = apply_stock_movement(&item, &StockMovement::consume(4), now).unwrap_err();
        assert_eq!(
            err,
            CoreError::NegativeStock {
                code: "A1".to_string(),
                on_hand: 3,
                delta: -4
            }
        );
    }

    #[test]
    fn test_consuming_everything_zeroes_total() {
        let now = Utc::now();
        let item = apply_stock_movement(&item(), &StockMovement::restock(10, d(200)), now).unwrap();
        let item = apply_stock_movement(&item, &StockMovement::restock(5, d(300)), now).unwrap();
        let item = apply_stock_movement(&item, &StockMovement::consume(15), now).unwrap();

        assert_eq!(item.quantity_on_hand, 0);
        assert_eq!(item.total_cost_cents, Decimal::ZERO);
        // Unit cost survives so the price stays meaningful until restock.
        assert!(item.unit_cost_cents > d(233));
    }

    #[test]
    fn test_cost_override_on_metadata_edit() {
        let now = Utc::now();
        let item = apply_stock_movement(&item(), &StockMovement::restock(2, d(100)), now).unwrap();
        let item =
            apply_stock_movement(&item, &StockMovement::revalue(None, Some(d(120))), now).unwrap();
        assert_eq!(item.unit_cost_cents, d(120));
        assert_eq!(item.total_cost_cents, d(240));

        // Cost overrides are ignored when stock moves.
        let mut movement = StockMovement::restock(2, d(100));
        movement.cost_override_cents = Some(d(999));
        let item = apply_stock_movement(&item, &movement, now).unwrap();
        assert_eq!(item.unit_cost_cents, d(110));
    }

    #[test]
    fn test_negative_cost_rejected() {
        let err = apply_stock_movement(&item(), &StockMovement::restock(1, d(-1)), Utc::now())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_register_item_rejects_duplicates() {
        let now = Utc::now();
        let new_item = NewItem {
            code: "A1".to_string(),
            description: "Widget".to_string(),
            margin_bps: 3000,
            image_ref: None,
            initial_quantity: 10,
            initial_unit_cost_cents: d(200),
        };

        let mut snapshot = Snapshot::new();
        with_absent::<InventoryItem>(&mut snapshot, "A1");
        let plan = plan_register_item(&snapshot, &new_item, now).unwrap();
        assert_eq!(plan.value.quantity_on_hand, 10);
        assert_eq!(plan.value.sale_price_cents, 260);
        assert_eq!(plan.writes.len(), 1);

        let mut snapshot = Snapshot::new();
        with_doc(&mut snapshot, &plan.value);
        let err = plan_register_item(&snapshot, &new_item, now).unwrap_err();
        assert!(matches!(err, CoreError::Duplicate { .. }));
    }

    #[test]
    fn test_register_without_stock_keeps_cost() {
        let mut snapshot = Snapshot::new();
        with_absent::<InventoryItem>(&mut snapshot, "B2");
        let new_item = NewItem {
            code: "B2".to_string(),
            description: "Bolt".to_string(),
            margin_bps: 1000,
            image_ref: Some("img/b2.png".to_string()),
            initial_quantity: 0,
            initial_unit_cost_cents: d(50),
        };
        let plan = plan_register_item(&snapshot, &new_item, Utc::now()).unwrap();
        assert_eq!(plan.value.unit_cost_cents, d(50));
        assert_eq!(plan.value.sale_price_cents, 55);
        assert_eq!(plan.value.total_cost_cents, Decimal::ZERO);
    }

    #[test]
    fn test_update_details_keeps_valuation() {
        let now = Utc::now();
        let stocked = apply_stock_movement(&item(), &StockMovement::restock(3, d(70)), now).unwrap();
        let mut snapshot = Snapshot::new();
        with_doc(&mut snapshot, &stocked);

        let update = ItemDetailsUpdate {
            description: Some("Blue widget".to_string()),
            image_ref: Some(Some("img/a1.png".to_string())),
        };
        let plan = plan_update_details(&snapshot, "A1", &update, now).unwrap();
        assert_eq!(plan.value.description, "Blue widget");
        assert_eq!(plan.value.total_cost_cents, stocked.total_cost_cents);
        assert_eq!(plan.value.image_ref.as_deref(), Some("img/a1.png"));
    }

    #[test]
    fn test_movement_on_missing_item() {
        let mut snapshot = Snapshot::new();
        with_absent::<InventoryItem>(&mut snapshot, "ZZ");
        let err = plan_stock_movement(&snapshot, "ZZ", &StockMovement::consume(1), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    proptest! {
        #[test]
        fn prop_valuation_invariant_holds(
            moves in prop::collection::vec((-50i64..=50, 0i64..=100_000), 1..60)
        ) {
            let now = Utc::now();
            let mut item = item();

            for (delta, cost) in moves {
                let movement = if delta >= 0 {
                    StockMovement::restock(delta, Decimal::new(cost, 2))
                } else {
                    StockMovement::consume(-delta)
                };
                match apply_stock_movement(&item, &movement, now) {
                    Ok(next) => item = next,
                    Err(CoreError::NegativeStock { .. }) => {
                        prop_assert!(item.quantity_on_hand + delta < 0);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {other}"),
                }

                prop_assert!(item.quantity_on_hand >= 0);
                prop_assert!(item.valuation_drift() <= Decimal::new(1, 6));
                prop_assert!(!item.total_cost_cents.is_sign_negative() || item.total_cost_cents.is_zero());
            }
        }
    }
}
