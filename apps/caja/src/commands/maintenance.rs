//! # Maintenance Commands
//!
//! Ledger reset, reports and the subscription feeds that keep
//! [`AppState`](crate::state::AppState) current.
//!
//! ## Live Record Sets
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  watch_ledger(engine, state)                                           │
//! │                                                                         │
//! │  engine.subscribe::<InventoryItem>() ──► task ──► InventoryLoaded      │
//! │  engine.subscribe::<Client>()        ──► task ──► ClientsLoaded        │
//! │  engine.subscribe::<Receivable>()    ──► task ──► ReceivablesLoaded    │
//! │  engine.subscribe::<Payable>()       ──► task ──► PayablesLoaded       │
//! │  engine.subscribe::<CashAccount>()   ──► task ──► CashLoaded           │
//! │                                                                         │
//! │  Each task ends when its store closes or the LedgerWatch is dropped.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caja_core::ledger::{AuditReport, LedgerSummary, ResetSummary};
use caja_core::{CashAccount, Client, Document, InventoryItem, Payable, Receivable};
use caja_db::{LedgerEngine, LedgerStore, Subscription};
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{complete, fail};
use crate::error::ApiError;
use crate::state::{Action, SharedState};

/// Deletes every sale, receivable and payable and zeroes client debt.
///
/// Inventory and the cash account are kept. Requires `confirmed`.
pub async fn reset_ledger<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
    confirmed: bool,
) -> Result<ResetSummary, ApiError> {
    if !confirmed {
        return Err(fail(
            state,
            ApiError::validation("Reset must be confirmed; it deletes every sale and balance"),
        ));
    }
    info!(tenant = engine.tenant(), "reset_ledger command");
    let result = engine.reset_ledger().await;
    complete(state, result, |summary| Action::LedgerReset(*summary))
}

/// Runs the consistency audit.
pub async fn audit<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<AuditReport, ApiError> {
    debug!("audit command");
    engine.audit().await.map_err(|e| fail(state, e.into()))
}

pub async fn summary<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    state: &SharedState,
) -> Result<LedgerSummary, ApiError> {
    engine.summary().await.map_err(|e| fail(state, e.into()))
}

// =============================================================================
// Subscriptions
// =============================================================================

/// The running subscription feeds. Dropping it stops them.
#[derive(Debug)]
pub struct LedgerWatch {
    tasks: Vec<JoinHandle<()>>,
}

impl LedgerWatch {
    /// Number of feeds still running.
    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for LedgerWatch {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Starts one feed per collection the UI shows.
///
/// Must be called inside a Tokio runtime.
pub fn watch_ledger<S: LedgerStore>(engine: &LedgerEngine<S>, state: &SharedState) -> LedgerWatch {
    debug!(tenant = engine.tenant(), "Starting ledger subscriptions");
    let tasks = vec![
        feed(engine.subscribe::<InventoryItem>(), state.clone(), Action::InventoryLoaded),
        feed(engine.subscribe::<Client>(), state.clone(), Action::ClientsLoaded),
        feed(engine.subscribe::<Receivable>(), state.clone(), Action::ReceivablesLoaded),
        feed(engine.subscribe::<Payable>(), state.clone(), Action::PayablesLoaded),
        feed(engine.subscribe::<CashAccount>(), state.clone(), |mut accounts| {
            Action::CashLoaded(
                accounts
                    .pop()
                    .unwrap_or_else(|| CashAccount::empty(Utc::now())),
            )
        }),
    ];
    LedgerWatch { tasks }
}

fn feed<S, D>(
    mut subscription: Subscription<S, D>,
    state: SharedState,
    to_action: fn(Vec<D>) -> Action,
) -> JoinHandle<()>
where
    S: LedgerStore,
    D: Document,
{
    tokio::spawn(async move {
        while let Some(result) = subscription.next().await {
            match result {
                Ok(records) => state.dispatch(to_action(records)),
                Err(e) => {
                    error!(collection = %D::COLLECTION, error = %e, "Subscription read failed");
                    state.dispatch(Action::Failed(e.into()));
                }
            }
        }
        warn!(collection = %D::COLLECTION, "Subscription closed");
    })
}
