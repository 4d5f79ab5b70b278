//! # Application State
//!
//! Everything a UI renders, updated only through [`AppState::reduce`].
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reducer Loop                                         │
//! │                                                                         │
//! │  UI event ──► command ──► LedgerEngine ──► Ok(record) / Err(ApiError)  │
//! │                   │                              │                      │
//! │                   │            Action::SaleCommitted / Action::Failed   │
//! │                   ▼                              ▼                      │
//! │             SharedState::dispatch(action) ──► AppState::reduce         │
//! │                   ▲                                                     │
//! │                   │  Action::InventoryLoaded(items), ...               │
//! │  Subscription ────┘  (full record set after every commit)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reducer never touches the store. Record sets are replaced wholesale
//! when a subscription pushes; outcomes of commands only set notices,
//! clear the cart, or record the error.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use caja_core::ledger::{PaymentOutcome, ResetSummary};
use caja_core::{
    CashAccount, Client, InventoryItem, Money, Payable, Receivable, RecordKind, Sale, SaleType,
    SettlementStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cart::{Cart, CartTotals};
use crate::error::ApiError;

// =============================================================================
// Actions
// =============================================================================

/// Every change the UI state can undergo.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Cart
    CartAdd { item: InventoryItem, quantity: i64 },
    CartUpdate { code: String, quantity: i64 },
    CartRemove { code: String },
    CartClear,

    // Checkout selection
    SelectClient(Option<String>),
    SetSaleType(SaleType),

    // Subscription pushes
    InventoryLoaded(Vec<InventoryItem>),
    ClientsLoaded(Vec<Client>),
    ReceivablesLoaded(Vec<Receivable>),
    PayablesLoaded(Vec<Payable>),
    CashLoaded(CashAccount),

    // Command outcomes
    ItemSaved(InventoryItem),
    ClientRegistered(Client),
    PayableRecorded(Payable),
    SaleCommitted(Sale),
    PaymentApplied(PaymentOutcome),
    CapitalChanged(CashAccount),
    LedgerReset(ResetSummary),
    Failed(ApiError),

    DismissError,
    DismissNotice,
}

// =============================================================================
// State
// =============================================================================

/// UI state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub cart: Cart,
    pub selected_client: Option<String>,
    pub sale_type: SaleType,

    pub inventory: Vec<InventoryItem>,
    pub clients: Vec<Client>,
    pub receivables: Vec<Receivable>,
    pub payables: Vec<Payable>,
    pub cash: Option<CashAccount>,

    /// Last failure, shown until dismissed or the next successful command.
    pub last_error: Option<ApiError>,
    /// Last confirmation message.
    pub last_notice: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState {
            cart: Cart::new(),
            selected_client: None,
            sale_type: SaleType::Cash,
            inventory: Vec::new(),
            clients: Vec::new(),
            receivables: Vec::new(),
            payables: Vec::new(),
            cash: None,
            last_error: None,
            last_notice: None,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one action.
    pub fn reduce(&mut self, action: Action) {
        match action {
            Action::CartAdd { item, quantity } => {
                let result = self.cart.add_item(&item, quantity);
                self.cart_result(result);
            }
            Action::CartUpdate { code, quantity } => {
                let result = self.cart.update_quantity(&code, quantity);
                self.cart_result(result);
            }
            Action::CartRemove { code } => {
                let result = self.cart.remove_item(&code);
                self.cart_result(result);
            }
            Action::CartClear => self.cart.clear(),

            Action::SelectClient(id) => self.selected_client = id,
            Action::SetSaleType(sale_type) => self.sale_type = sale_type,

            Action::InventoryLoaded(items) => self.inventory = items,
            Action::ClientsLoaded(clients) => {
                if let Some(selected) = &self.selected_client {
                    if !clients.iter().any(|c| &c.id == selected) {
                        self.selected_client = None;
                    }
                }
                self.clients = clients;
            }
            Action::ReceivablesLoaded(receivables) => self.receivables = receivables,
            Action::PayablesLoaded(payables) => self.payables = payables,
            Action::CashLoaded(account) => self.cash = Some(account),

            Action::ItemSaved(item) => {
                let notice = format!(
                    "{}: {} on hand at {}",
                    item.code,
                    item.quantity_on_hand,
                    item.sale_price()
                );
                upsert(&mut self.inventory, item, |i| i.code.as_str());
                self.succeed(notice);
            }
            Action::ClientRegistered(client) => {
                let notice = format!("Client {} registered", client.name);
                self.selected_client = Some(client.id.clone());
                upsert(&mut self.clients, client, |c| c.id.as_str());
                self.succeed(notice);
            }
            Action::PayableRecorded(payable) => {
                let notice = format!(
                    "Payable to {} for {} recorded",
                    payable.provider,
                    payable.current_balance()
                );
                upsert(&mut self.payables, payable, |p| p.id.as_str());
                self.succeed(notice);
            }
            Action::SaleCommitted(sale) => {
                let shown = self.cart.subtotal();
                self.cart.clear();
                self.sale_type = SaleType::Cash;
                let mut notice = match sale.sale_type {
                    SaleType::Cash => format!("Sale {} paid: {}", sale.id, sale.subtotal()),
                    SaleType::Credit => {
                        format!("Sale {} on credit: {}", sale.id, sale.subtotal())
                    }
                };
                // Checkout charges current prices, not the ones frozen in the cart.
                if shown != sale.subtotal() {
                    notice.push_str(&format!(" (prices changed; cart showed {})", shown));
                }
                self.succeed(notice);
            }
            Action::PaymentApplied(outcome) => {
                self.succeed(payment_notice(&outcome));
            }
            Action::CapitalChanged(account) => {
                let notice = format!("Capital now {}", account.current_capital());
                self.cash = Some(account);
                self.succeed(notice);
            }
            Action::LedgerReset(summary) => {
                self.cart.clear();
                self.succeed(format!(
                    "Ledger reset: {} sales, {} receivables, {} payables removed",
                    summary.sales_deleted, summary.receivables_deleted, summary.payables_deleted
                ));
            }
            Action::Failed(error) => {
                debug!(code = ?error.code, "Action failed");
                self.last_notice = None;
                self.last_error = Some(error);
            }

            Action::DismissError => self.last_error = None,
            Action::DismissNotice => self.last_notice = None,
        }
    }

    fn cart_result(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => self.last_error = None,
            Err(message) => self.last_error = Some(ApiError::cart(message)),
        }
    }

    fn succeed(&mut self, notice: String) {
        self.last_error = None;
        self.last_notice = Some(notice);
    }

    pub fn cart_totals(&self) -> CartTotals {
        CartTotals::from(&self.cart)
    }

    pub fn selected_client(&self) -> Option<&Client> {
        let id = self.selected_client.as_deref()?;
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn item(&self, code: &str) -> Option<&InventoryItem> {
        self.inventory.iter().find(|i| i.code == code)
    }

    /// Unsettled receivables of one client, oldest first.
    pub fn open_receivables_of(&self, client_id: &str) -> Vec<&Receivable> {
        let mut open: Vec<&Receivable> = self
            .receivables
            .iter()
            .filter(|r| r.client_id == client_id && r.status != SettlementStatus::Settled)
            .collect();
        open.sort_by_key(|r| r.created_at);
        open
    }

    pub fn open_payables(&self) -> Vec<&Payable> {
        self.payables
            .iter()
            .filter(|p| p.status != SettlementStatus::Settled)
            .collect()
    }
}

fn upsert<T>(records: &mut Vec<T>, record: T, id: impl Fn(&T) -> &str) {
    match records.iter().position(|r| id(r) == id(&record)) {
        Some(idx) => records[idx] = record,
        None => records.push(record),
    }
}

fn payment_notice(outcome: &PaymentOutcome) -> String {
    let kind = match outcome.kind {
        RecordKind::Receivable => "Receivable",
        RecordKind::Payable => "Payable",
    };
    let amount = Money::from_cents(outcome.amount_cents);
    let mut notice = match outcome.status {
        SettlementStatus::Settled => format!("{} {} settled with {}", kind, outcome.record_id, amount),
        _ => format!(
            "{} {} paid {}, balance {}",
            kind,
            outcome.record_id,
            amount,
            Money::from_cents(outcome.new_balance_cents)
        ),
    };
    if outcome.written_off_cents > 0 {
        notice.push_str(&format!(
            " ({} written off)",
            Money::from_cents(outcome.written_off_cents)
        ));
    }
    if outcome.profit_realized_cents > 0 {
        notice.push_str(&format!(
            ", profit {} realized",
            Money::from_cents(outcome.profit_realized_cents)
        ));
    }
    notice
}

// =============================================================================
// Shared State
// =============================================================================

/// `AppState` shared between commands and subscription tasks.
///
/// ## Thread Safety
/// Every reduction runs under one `Mutex`. A panic while holding the lock
/// leaves the last fully applied state, which is reused.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<AppState>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies an action.
    pub fn dispatch(&self, action: Action) {
        self.lock().reduce(action);
    }

    /// Applies a cart action and returns the error it recorded, if any.
    ///
    /// Cart actions always overwrite `last_error`, so reading it under the
    /// same lock gives this action's result.
    pub fn dispatch_cart(&self, action: Action) -> Result<CartTotals, ApiError> {
        let mut state = self.lock();
        state.reduce(action);
        match &state.last_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.cart_totals()),
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> AppState {
        self.lock().clone()
    }

    /// Executes a function with read access to the state.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        f(&self.lock())
    }
}
