//! # Inventory Commands
//!
//! Item registration and stock movements. Valuation (moving-average cost,
//! sale price) happens inside the transaction.

use caja_core::ledger::{ItemDetailsUpdate, NewItem, StockMovement};
use caja_core::{InventoryItem, MarginRate};
use caja_db::{LedgerEngine, LedgerStore};
use rust_decimal::Decimal;
use tracing::debug;

use super::complete;
use crate::error::ApiError;
use crate::state::{Action, SharedState};

pub async fn register_item<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    new_item: NewItem,
) -> Result<InventoryItem, ApiError> {
    debug!(code = %new_item.code, "register_item command");
    let result = engine.register_item(new_item).await;
    complete(state, result, |item| Action::ItemSaved(item.clone()))
}

/// Receives `quantity` units bought at `unit_cost_cents` each.
pub async fn restock<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    code: &str,
    quantity: i64,
    unit_cost_cents: Decimal,
) -> Result<InventoryItem, ApiError> {
    debug!(code, quantity, unit_cost = %unit_cost_cents, "restock command");
    let result = engine
        .apply_stock_movement(code, StockMovement::restock(quantity, unit_cost_cents))
        .await;
    complete(state, result, |item| Action::ItemSaved(item.clone()))
}

/// Takes units out of stock without a sale (breakage, own use).
pub async fn consume_stock<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    code: &str,
    quantity: i64,
) -> Result<InventoryItem, ApiError> {
    debug!(code, quantity, "consume_stock command");
    let result = engine
        .apply_stock_movement(code, StockMovement::consume(quantity))
        .await;
    complete(state, result, |item| Action::ItemSaved(item.clone()))
}

/// Changes the margin and/or overrides the unit cost without moving stock.
pub async fn revalue_item<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    code: &str,
    margin_bps: Option<u32>,
    unit_cost_override_cents: Option<Decimal>,
) -> Result<InventoryItem, ApiError> {
    debug!(code, ?margin_bps, "revalue_item command");
    let movement =
        StockMovement::revalue(margin_bps.map(MarginRate::from_bps), unit_cost_override_cents);
    let result = engine.apply_stock_movement(code, movement).await;
    complete(state, result, |item| Action::ItemSaved(item.clone()))
}

pub async fn update_item_details<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    code: &str,
    update: ItemDetailsUpdate,
) -> Result<InventoryItem, ApiError> {
    debug!(code, "update_item_details command");
    let result = engine.update_item_details(code, update).await;
    complete(state, result, |item| Action::ItemSaved(item.clone()))
}

/// Reloads the inventory into the state.
pub async fn refresh_inventory<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<Vec<InventoryItem>, ApiError> {
    let result = engine.items().await;
    complete(state, result, |items| Action::InventoryLoaded(items.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::shop;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_restock_moves_average_cost() {
        let (engine, state) = shop().await;

        // 5 @ $50.00 + 5 @ $60.00 → $55.00
        let item = restock(&engine, &state, "A", 5, Decimal::from(6000))
            .await
            .unwrap();

        assert_eq!(item.quantity_on_hand, 10);
        assert_eq!(item.unit_cost_cents, Decimal::from(5500));
        assert_eq!(item.sale_price_cents, 7700);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.item("A").unwrap().quantity_on_hand, 10);
        assert!(snapshot.last_notice.is_some());
    }

    #[tokio::test]
    async fn test_consume_beyond_stock_fails() {
        let (engine, state) = shop().await;

        let err = consume_stock(&engine, &state, "B", 6).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(state.snapshot().last_error, Some(err));
        assert_eq!(engine.item("B").await.unwrap().quantity_on_hand, 5);
    }

    #[tokio::test]
    async fn test_revalue_changes_price_only() {
        let (engine, state) = shop().await;

        let item = revalue_item(&engine, &state, "B", Some(2500), None)
            .await
            .unwrap();
        assert_eq!(item.quantity_on_hand, 5);
        assert_eq!(item.sale_price_cents, 2500);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let (engine, state) = shop().await;

        let err = register_item(
            &engine,
            &state,
            NewItem {
                code: "A".to_string(),
                description: "Again".to_string(),
                margin_bps: 1000,
                image_ref: None,
                initial_quantity: 1,
                initial_unit_cost_cents: Decimal::from(100),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_update_details_and_refresh() {
        let (engine, state) = shop().await;

        update_item_details(
            &engine,
            &state,
            "A",
            ItemDetailsUpdate {
                description: Some("Aceite 1L".to_string()),
                image_ref: Some(Some("img/aceite.png".to_string())),
            },
        )
        .await
        .unwrap();

        let items = refresh_inventory(&engine, &state).await.unwrap();
        assert_eq!(items.len(), 2);
        let a = state.snapshot().item("A").cloned().unwrap();
        assert_eq!(a.description, "Aceite 1L");
        assert_eq!(a.image_ref.as_deref(), Some("img/aceite.png"));
    }
}
