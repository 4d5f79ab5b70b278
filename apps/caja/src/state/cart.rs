//! # Cart
//!
//! The checkout cart held in [`AppState`](super::AppState).
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Action                       Cart Change                               │
//! │  ──────                       ───────────                               │
//! │                                                                         │
//! │  CartAdd { item, qty } ─────► lines.push(line) or line.qty += qty      │
//! │  CartUpdate { code, qty } ──► lines[i].qty = qty (0 removes)           │
//! │  CartRemove { code } ───────► lines.remove(i)                          │
//! │  CartClear / SaleCommitted ─► lines.clear()                            │
//! │                                                                         │
//! │  checkout() ───────────────► to_sale_lines() ──► SaleRequest           │
//! │                                                                         │
//! │  The price shown is frozen when the line is added. The sale itself     │
//! │  is priced from the inventory read inside the transaction.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caja_core::ledger::CartLine;
use caja_core::{InventoryItem, Money, MAX_CART_LINES, MAX_ITEM_QUANTITY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A line in the cart.
///
/// ## Design Notes
/// - `code`: Reference to the inventory item
/// - `description` and `unit_price_cents`: Frozen copy taken when the line
///   was added, so the cart displays consistently while inventory changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Item code
    pub code: String,

    /// Description at time of adding (frozen)
    pub description: String,

    /// Sale price in cents at time of adding (frozen)
    pub unit_price_cents: i64,

    /// Quantity in cart
    pub quantity: i64,

    /// When this line was added
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Creates a cart line from an inventory item, freezing its price.
    pub fn from_item(item: &InventoryItem, quantity: i64) -> Self {
        CartItem {
            code: item.code.clone(),
            description: item.description.clone(),
            unit_price_cents: item.sale_price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// The checkout cart.
///
/// ## Invariants
/// - Lines are unique by `code` (adding the same item increases quantity)
/// - Quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_LINES` lines
/// - A line never asks for more units than were on hand when it was added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,

    /// When the cart was created or last cleared
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// Creates an empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds an item or increases its quantity if already present.
    ///
    /// ## Returns
    /// - `Ok(())` on success
    /// - `Err(String)` if the quantity is out of range, exceeds the units
    ///   on hand, or the cart is full
    pub fn add_item(&mut self, item: &InventoryItem, quantity: i64) -> Result<(), String> {
        if quantity <= 0 {
            return Err("Quantity must be positive".to_string());
        }

        if let Some(line) = self.items.iter_mut().find(|l| l.code == item.code) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(format!(
                    "Quantity would exceed maximum of {}",
                    MAX_ITEM_QUANTITY
                ));
            }
            if new_qty > item.quantity_on_hand {
                return Err(format!(
                    "Only {} units of {} on hand",
                    item.quantity_on_hand, item.code
                ));
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_LINES {
            return Err(format!(
                "Cart cannot have more than {} lines",
                MAX_CART_LINES
            ));
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(format!("Quantity cannot exceed {}", MAX_ITEM_QUANTITY));
        }
        if quantity > item.quantity_on_hand {
            return Err(format!(
                "Only {} units of {} on hand",
                item.quantity_on_hand, item.code
            ));
        }

        self.items.push(CartItem::from_item(item, quantity));
        Ok(())
    }

    /// Sets the quantity of a line. Zero removes it.
    pub fn update_quantity(&mut self, code: &str, quantity: i64) -> Result<(), String> {
        if quantity == 0 {
            return self.remove_item(code);
        }
        if !(1..=MAX_ITEM_QUANTITY).contains(&quantity) {
            return Err(format!(
                "Quantity must be between 1 and {}",
                MAX_ITEM_QUANTITY
            ));
        }

        match self.items.iter_mut().find(|l| l.code == code) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(format!("Item {} not in cart", code)),
        }
    }

    pub fn remove_item(&mut self, code: &str) -> Result<(), String> {
        let initial_len = self.items.len();
        self.items.retain(|l| l.code != code);

        if self.items.len() == initial_len {
            Err(format!("Item {} not in cart", code))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|l| l.quantity).sum()
    }

    /// Subtotal at the frozen prices.
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The lines as they go into a `SaleRequest`.
    pub fn to_sale_lines(&self) -> Vec<CartLine> {
        self.items
            .iter()
            .map(|l| CartLine::new(l.code.as_str(), l.quantity))
            .collect()
    }
}

/// Cart totals for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal_cents: cart.subtotal().cents(),
        }
    }
}
