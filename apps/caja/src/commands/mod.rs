//! # Commands Module
//!
//! Every operation a UI can trigger.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (shared outcome handling)
//! ├── inventory.rs    ◄─── Register, restock, revalue, edit items
//! ├── sale.rs         ◄─── Cart, client selection, checkout
//! ├── settlement.rs   ◄─── Payables, payments on receivables and payables
//! ├── capital.rs      ◄─── Contributions, withdrawals, opening capital
//! └── maintenance.rs  ◄─── Reset, audit, summary, subscriptions
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  pub async fn pay_receivable(                                           │
//! │      engine: &LedgerEngine<S>,   ◄── the ledger                        │
//! │      state: &SharedState,        ◄── the UI state                      │
//! │      receivable_id: &str,        ◄── from the UI                       │
//! │      amount_cents: i64,                                                 │
//! │  ) -> Result<PaymentOutcome, ApiError>                                  │
//! │         │                                                               │
//! │         ├── Ok  ──► dispatch(Action::PaymentApplied(..)) ──► notice    │
//! │         └── Err ──► dispatch(Action::Failed(..))         ──► last_error│
//! │                                                                         │
//! │  Record sets are NOT refreshed here; the subscriptions started by      │
//! │  `watch_ledger` push them after each commit.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod capital;
pub mod inventory;
pub mod maintenance;
pub mod sale;
pub mod settlement;

use crate::error::ApiError;
use crate::state::{Action, SharedState};

/// Dispatches the outcome of a command and hands it back to the caller.
pub(crate) fn complete<T, E>(
    state: &SharedState,
    result: Result<T, E>,
    on_success: impl FnOnce(&T) -> Action,
) -> Result<T, ApiError>
where
    E: Into<ApiError>,
{
    match result {
        Ok(value) => {
            state.dispatch(on_success(&value));
            Ok(value)
        }
        Err(err) => Err(fail(state, err.into())),
    }
}

/// Records a failure in the state and returns it.
pub(crate) fn fail(state: &SharedState, error: ApiError) -> ApiError {
    state.dispatch(Action::Failed(error.clone()));
    error
}

#[cfg(test)]
pub(crate) mod testing {
    //! Engine fixtures shared by the command tests.

    use caja_core::ledger::NewItem;
    use caja_core::Money;
    use caja_db::{LedgerEngine, MemoryStore};
    use rust_decimal::Decimal;

    use crate::state::SharedState;

    pub const TENANT: &str = "tenant-test";

    pub fn engine() -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(MemoryStore::new(), TENANT)
    }

    /// An engine with $1,000.00 opening capital and two items:
    /// `A` (5 units, cost $50.00, price $70.00) and
    /// `B` (5 units, cost $20.00, price $30.00).
    pub async fn shop() -> (LedgerEngine<MemoryStore>, SharedState) {
        let engine = engine();
        engine
            .set_initial_capital(Money::from_cents(100_000), false)
            .await
            .unwrap();
        for (code, cost, bps) in [("A", 5000, 4000), ("B", 2000, 5000)] {
            engine
                .register_item(NewItem {
                    code: code.to_string(),
                    description: format!("Item {}", code),
                    margin_bps: bps,
                    image_ref: None,
                    initial_quantity: 5,
                    initial_unit_cost_cents: Decimal::from(cost),
                })
                .await
                .unwrap();
        }
        (engine, SharedState::new())
    }
}
