//! # Store Contract
//!
//! What every ledger store provides, and the retry loop that runs plans
//! against it.
//!
//! ## Transaction Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run_transaction(store, tenant, reads, plan, max_attempts)             │
//! │                                                                         │
//! │  attempt 1..=max_attempts                                              │
//! │    │                                                                    │
//! │    ├─► store.read(tenant, reads) ──► Snapshot                          │
//! │    │                                                                    │
//! │    ├─► plan(&Snapshot)                                                 │
//! │    │     └── Err(CoreError) ──► DbError::Rejected (no retry)           │
//! │    │                                                                    │
//! │    └─► store.commit(tenant, &Snapshot, writes)                         │
//! │          ├── Ok          ──► return value                              │
//! │          ├── Conflict    ──► warn!, next attempt                       │
//! │          └── other error ──► return error                              │
//! │                                                                         │
//! │  all attempts conflicted ──► DbError::RetriesExhausted                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod memory;
pub mod sqlite;

use std::collections::BTreeSet;
use std::future::Future;

use caja_core::document::DocKey;
use caja_core::{Collection, CoreResult, Document, Plan, ReadSet, Snapshot, WriteSet};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::error::{DbError, DbResult};

/// Attempts per transaction unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Capacity of each store's change channel.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Change Events
// =============================================================================

/// Pushed after every successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub tenant: String,
    pub collections: BTreeSet<Collection>,
}

impl ChangeEvent {
    pub fn touches(&self, tenant: &str, collection: Collection) -> bool {
        self.tenant == tenant && self.collections.contains(&collection)
    }
}

// =============================================================================
// LedgerStore Trait
// =============================================================================

/// A transactional, versioned document store.
///
/// Implementations guarantee:
/// - `read` returns one consistent view of every key and scan requested
/// - `commit` applies all writes or none, and only if every version in the
///   snapshot is still current; otherwise it returns `DbError::Conflict`
/// - every successful commit with writes is announced on `changes()`
pub trait LedgerStore: Clone + Send + Sync + 'static {
    /// Reads the keys and scans of `reads` for `tenant`.
    fn read(
        &self,
        tenant: &str,
        reads: &ReadSet,
    ) -> impl Future<Output = DbResult<Snapshot>> + Send;

    /// Applies `writes` if nothing in `snapshot` changed since it was read.
    fn commit(
        &self,
        tenant: &str,
        snapshot: &Snapshot,
        writes: WriteSet,
    ) -> impl Future<Output = DbResult<()>> + Send;

    /// Subscribes to commit notifications for every tenant.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;

    // -------------------------------------------------------------------------
    // Per-record CRUD
    // -------------------------------------------------------------------------

    /// Reads one document.
    fn get<D: Document>(
        &self,
        tenant: &str,
        id: &str,
    ) -> impl Future<Output = DbResult<Option<D>>> + Send {
        async move {
            let snapshot = self.read(tenant, &ReadSet::new().doc::<D>(id)).await?;
            Ok(snapshot.get::<D>(id)?)
        }
    }

    /// Reads every document of `D`'s collection, ordered by id.
    fn list<D: Document>(&self, tenant: &str) -> impl Future<Output = DbResult<Vec<D>>> + Send {
        async move {
            let snapshot = self
                .read(tenant, &ReadSet::new().scan(D::COLLECTION))
                .await?;
            Ok(snapshot.scan::<D>()?)
        }
    }

    /// Unconditionally writes one document.
    fn put<D: Document>(&self, tenant: &str, doc: &D) -> impl Future<Output = DbResult<()>> + Send {
        async move {
            let mut writes = WriteSet::new();
            writes.put(doc)?;
            self.commit(tenant, &Snapshot::new(), writes).await
        }
    }

    /// Unconditionally deletes one document.
    fn delete<D: Document>(
        &self,
        tenant: &str,
        id: &str,
    ) -> impl Future<Output = DbResult<()>> + Send {
        async move {
            let mut writes = WriteSet::new();
            writes.delete::<D>(id);
            self.commit(tenant, &Snapshot::new(), writes).await
        }
    }

    /// Deletes many documents in one all-or-nothing batch.
    fn delete_batch(
        &self,
        tenant: &str,
        keys: Vec<DocKey>,
    ) -> impl Future<Output = DbResult<()>> + Send {
        async move {
            let mut writes = WriteSet::new();
            for key in keys {
                writes.delete_key(key);
            }
            if writes.is_empty() {
                return Ok(());
            }
            self.commit(tenant, &Snapshot::new(), writes).await
        }
    }
}

// =============================================================================
// Transaction Runner
// =============================================================================

/// Runs `plan` as one atomic conditional transaction, retrying conflicts.
///
/// Plans that write nothing return without committing.
pub async fn run_transaction<S, T, F>(
    store: &S,
    tenant: &str,
    reads: &ReadSet,
    max_attempts: u32,
    mut plan: F,
) -> DbResult<T>
where
    S: LedgerStore,
    F: FnMut(&Snapshot) -> CoreResult<Plan<T>>,
{
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        let snapshot = store.read(tenant, reads).await?;
        let Plan { writes, value } = plan(&snapshot)?;

        if writes.is_empty() {
            debug!(tenant, attempt, "Transaction planned no writes");
            return Ok(value);
        }

        let write_count = writes.len();
        match store.commit(tenant, &snapshot, writes).await {
            Ok(()) => {
                debug!(tenant, attempt, writes = write_count, "Transaction committed");
                return Ok(value);
            }
            Err(err) if err.is_retryable() => {
                warn!(tenant, attempt, max_attempts = attempts, error = %err, "Transaction conflict, retrying");
            }
            Err(err) => {
                error!(tenant, attempt, error = %err, "Transaction commit failed");
                return Err(err);
            }
        }
    }

    warn!(tenant, attempts, "Transaction gave up after repeated conflicts");
    Err(DbError::RetriesExhausted { attempts })
}
