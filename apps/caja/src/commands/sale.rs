//! # Sale Commands
//!
//! Cart manipulation, client selection and checkout.
//!
//! ## Checkout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AppState { cart, selected_client, sale_type }                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRequest { client_id, sale_type, lines }                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  engine.commit_sale()  ── one transaction ──►  stock out, Sale,        │
//! │       │                                        cash or receivable      │
//! │       ├── Ok(sale) ──► Action::SaleCommitted ──► cart cleared           │
//! │       └── Err(e)   ──► Action::Failed        ──► cart kept             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caja_core::ledger::SaleRequest;
use caja_core::{Client, Sale, SaleType};
use caja_db::{LedgerEngine, LedgerStore};
use tracing::{debug, info, warn};

use super::{complete, fail};
use crate::error::ApiError;
use crate::state::{Action, CartTotals, SharedState};

// =============================================================================
// Cart
// =============================================================================

/// Adds an item at its current price.
pub async fn add_to_cart<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    code: &str,
    quantity: i64,
) -> Result<CartTotals, ApiError> {
    debug!(code, quantity, "add_to_cart command");

    let item = engine
        .item(code)
        .await
        .map_err(|e| fail(state, e.into()))?;

    state.dispatch_cart(Action::CartAdd { item, quantity })
}

/// Sets a line's quantity; zero removes it.
pub fn update_cart_item(
    state: &SharedState,
    code: &str,
    quantity: i64,
) -> Result<CartTotals, ApiError> {
    debug!(code, quantity, "update_cart_item command");
    state.dispatch_cart(Action::CartUpdate {
        code: code.to_string(),
        quantity,
    })
}

pub fn remove_from_cart(state: &SharedState, code: &str) -> Result<CartTotals, ApiError> {
    debug!(code, "remove_from_cart command");
    state.dispatch_cart(Action::CartRemove {
        code: code.to_string(),
    })
}

pub fn clear_cart(state: &SharedState) -> CartTotals {
    state.dispatch(Action::CartClear);
    state.with(|s| s.cart_totals())
}

pub fn get_cart(state: &SharedState) -> CartTotals {
    state.with(|s| s.cart_totals())
}

// =============================================================================
// Checkout Selection
// =============================================================================

pub fn select_client(state: &SharedState, client_id: Option<String>) {
    state.dispatch(Action::SelectClient(client_id));
}

pub fn set_sale_type(state: &SharedState, sale_type: SaleType) {
    state.dispatch(Action::SetSaleType(sale_type));
}

/// Registers a client and selects it for the next sale.
pub async fn register_client<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    name: &str,
) -> Result<Client, ApiError> {
    debug!("register_client command");
    let result = engine.register_client(name).await;
    complete(state, result, |client| Action::ClientRegistered(client.clone()))
}

pub async fn refresh_clients<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<Vec<Client>, ApiError> {
    let result = engine.clients().await;
    complete(state, result, |clients| Action::ClientsLoaded(clients.clone()))
}

// =============================================================================
// Checkout
// =============================================================================

/// Commits the cart as a sale to the selected client.
pub async fn checkout<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<Sale, ApiError> {
    let (request, shown) = state.with(|s| {
        let request = SaleRequest {
            client_id: s.selected_client.clone(),
            sale_type: s.sale_type,
            lines: s.cart.to_sale_lines(),
        };
        (request, s.cart.subtotal())
    });
    debug!(
        lines = request.lines.len(),
        sale_type = ?request.sale_type,
        "checkout command"
    );

    if request.lines.is_empty() {
        return Err(fail(state, ApiError::validation("Cart is empty")));
    }
    if request.client().is_none() {
        return Err(fail(state, ApiError::validation("Select a client first")));
    }

    let result = engine.commit_sale(request).await;
    let sale = complete(state, result, |sale| Action::SaleCommitted(sale.clone()))?;

    if sale.subtotal() != shown {
        warn!(
            sale_id = %sale.id,
            cart = shown.cents(),
            charged = sale.subtotal_cents,
            "Prices changed after items were added to the cart"
        );
    }
    info!(sale_id = %sale.id, subtotal = sale.subtotal_cents, "Checkout complete");
    Ok(sale)
}
