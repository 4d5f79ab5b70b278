//! # State Module
//!
//! UI-side state, kept apart from the ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────────┐  │
//! │  │  LedgerEngine<S>     │        │  SharedState                     │  │
//! │  │                      │        │  Arc<Mutex<AppState>>            │  │
//! │  │  owns no cache;      │        │                                  │  │
//! │  │  every read goes to  │        │  cart, selection, record sets,   │  │
//! │  │  the store           │        │  last_error, last_notice         │  │
//! │  └──────────────────────┘        └──────────────────────────────────┘  │
//! │             │                                    ▲                      │
//! │             └──── commands / subscriptions ──────┘                      │
//! │                        dispatch(Action)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod app;
mod cart;

pub use app::{Action, AppState, SharedState};
pub use cart::{Cart, CartItem, CartTotals};
