//! # In-Memory Store
//!
//! A [`LedgerStore`] kept in process memory. Used by engine tests, with
//! fault injection to exercise retries and atomicity.
//!
//! ## Faults
//! ```text
//! inject_conflicts(n)        next n commits fail with Conflict before
//!                            touching anything (a concurrent writer won)
//! fail_after_writes(k)       next commit stages k writes, then fails;
//!                            the staged copy is discarded
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use caja_core::document::{CollectionScan, DocKey, VersionedDoc};
use caja_core::{Collection, ReadSet, Snapshot, Version, WriteSet};
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeEvent, LedgerStore, CHANGE_CHANNEL_CAPACITY};
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone, Default)]
struct TenantData {
    docs: BTreeMap<DocKey, VersionedDoc>,
    collection_versions: HashMap<Collection, Version>,
}

impl TenantData {
    fn collection_version(&self, collection: Collection) -> Version {
        self.collection_versions
            .get(&collection)
            .copied()
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Faults {
    conflicts: u32,
    fail_after_writes: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    tenants: HashMap<String, TenantData>,
    faults: Faults,
    commits: u64,
}

/// Shared in-memory store. Clones see the same data.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        MemoryStore {
            inner: Arc::new(Mutex::new(Inner::default())),
            changes,
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| DbError::Internal("memory store lock poisoned".to_string()))
    }

    /// Makes the next `n` commits fail with `Conflict`.
    pub fn inject_conflicts(&self, n: u32) -> DbResult<()> {
        self.lock()?.faults.conflicts = n;
        Ok(())
    }

    /// Makes the next commit fail after staging `k` writes.
    pub fn fail_after_writes(&self, k: usize) -> DbResult<()> {
        self.lock()?.faults.fail_after_writes = Some(k);
        Ok(())
    }

    /// Number of successful commits with writes.
    pub fn commit_count(&self) -> DbResult<u64> {
        Ok(self.lock()?.commits)
    }

    /// Number of documents stored for a tenant.
    pub fn document_count(&self, tenant: &str) -> DbResult<usize> {
        Ok(self
            .lock()?
            .tenants
            .get(tenant)
            .map(|t| t.docs.len())
            .unwrap_or(0))
    }

    fn read_sync(&self, tenant: &str, reads: &ReadSet) -> DbResult<Snapshot> {
        let inner = self.lock()?;
        let empty = TenantData::default();
        let data = inner.tenants.get(tenant).unwrap_or(&empty);

        let mut snapshot = Snapshot::new();
        for key in reads.keys() {
            snapshot.insert_doc(key.clone(), data.docs.get(key).cloned());
        }
        for collection in reads.scans() {
            let docs = data
                .docs
                .iter()
                .filter(|(key, _)| key.collection == collection)
                .map(|(key, doc)| (key.id.clone(), doc.clone()))
                .collect();
            snapshot.insert_scan(
                collection,
                CollectionScan {
                    version: data.collection_version(collection),
                    docs,
                },
            );
        }
        Ok(snapshot)
    }

    fn commit_sync(&self, tenant: &str, snapshot: &Snapshot, writes: WriteSet) -> DbResult<()> {
        let mut inner = self.lock()?;

        if inner.faults.conflicts > 0 {
            inner.faults.conflicts -= 1;
            return Err(DbError::Conflict("injected conflict".to_string()));
        }

        let current = inner.tenants.get(tenant).cloned().unwrap_or_default();

        for (key, expected) in snapshot.key_versions() {
            let actual = current.docs.get(key).map(|d| d.version);
            if actual != expected {
                return Err(DbError::Conflict(format!("{key} changed")));
            }
        }
        for (collection, expected) in snapshot.scan_versions() {
            if current.collection_version(collection) != expected {
                return Err(DbError::Conflict(format!("{collection} changed")));
            }
        }

        let fail_after = inner.faults.fail_after_writes.take();
        let collections = writes.collections();

        // Writes land on a staging copy that only replaces the tenant once
        // every write has been applied.
        let mut staging = current;
        let mut stamped: HashMap<Collection, Version> = HashMap::new();
        for collection in &collections {
            let next = staging.collection_version(*collection) + 1;
            staging.collection_versions.insert(*collection, next);
            stamped.insert(*collection, next);
        }

        for (applied, (key, body)) in writes.into_iter().enumerate() {
            if fail_after == Some(applied) {
                return Err(DbError::Internal(format!(
                    "injected failure after {applied} staged writes"
                )));
            }
            match body {
                Some(body) => {
                    let version = stamped.get(&key.collection).copied().unwrap_or(1);
                    staging.docs.insert(key, VersionedDoc { version, body });
                }
                None => {
                    staging.docs.remove(&key);
                }
            }
        }

        if collections.is_empty() {
            return Ok(());
        }

        inner.tenants.insert(tenant.to_string(), staging);
        inner.commits += 1;
        drop(inner);

        debug!(tenant, ?collections, "Memory store commit applied");
        // No subscribers is fine.
        let _ = self.changes.send(ChangeEvent {
            tenant: tenant.to_string(),
            collections,
        });
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    async fn read(&self, tenant: &str, reads: &ReadSet) -> DbResult<Snapshot> {
        self.read_sync(tenant, reads)
    }

    async fn commit(&self, tenant: &str, snapshot: &Snapshot, writes: WriteSet) -> DbResult<()> {
        self.commit_sync(tenant, snapshot, writes)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::run_transaction;
    use caja_core::{Client, CoreError, Plan};
    use chrono::Utc;

    const TENANT: &str = "t1";

    fn client(id: &str, debt: i64) -> Client {
        let mut client = Client::new(id, "Ana", Utc::now());
        client.current_debt_cents = debt;
        client
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let store = MemoryStore::new();
        store.put(TENANT, &client("c1", 10)).await.unwrap();
        store.put(TENANT, &client("c2", 20)).await.unwrap();

        let c1: Option<Client> = store.get(TENANT, "c1").await.unwrap();
        assert_eq!(c1.unwrap().current_debt_cents, 10);

        let all: Vec<Client> = store.list(TENANT).await.unwrap();
        assert_eq!(all.len(), 2);

        store.delete::<Client>(TENANT, "c1").await.unwrap();
        assert!(store.get::<Client>(TENANT, "c1").await.unwrap().is_none());

        // Tenants are isolated.
        assert!(store.list::<Client>("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_snapshot_conflicts() {
        let store = MemoryStore::new();
        store.put(TENANT, &client("c1", 0)).await.unwrap();

        let reads = ReadSet::new().doc::<Client>("c1");
        let stale = store.read(TENANT, &reads).await.unwrap();
        store.put(TENANT, &client("c1", 5)).await.unwrap();

        let mut writes = WriteSet::new();
        writes.put(&client("c1", 99)).unwrap();
        let err = store.commit(TENANT, &stale, writes).await.unwrap_err();
        assert!(err.is_retryable());

        let c1: Client = store.get(TENANT, "c1").await.unwrap().unwrap();
        assert_eq!(c1.current_debt_cents, 5);
    }

    #[tokio::test]
    async fn test_scan_detects_inserts() {
        let store = MemoryStore::new();
        let reads = ReadSet::new().scan(Collection::Clients);
        let stale = store.read(TENANT, &reads).await.unwrap();

        store.put(TENANT, &client("new", 0)).await.unwrap();

        let mut writes = WriteSet::new();
        writes.put(&client("other", 0)).unwrap();
        assert!(matches!(
            store.commit(TENANT, &stale, writes).await,
            Err(DbError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_recreated_document_gets_new_version() {
        let store = MemoryStore::new();
        store.put(TENANT, &client("c1", 0)).await.unwrap();
        let reads = ReadSet::new().doc::<Client>("c1");
        let stale = store.read(TENANT, &reads).await.unwrap();

        store.delete::<Client>(TENANT, "c1").await.unwrap();
        store.put(TENANT, &client("c1", 0)).await.unwrap();

        let mut writes = WriteSet::new();
        writes.put(&client("c1", 1)).unwrap();
        assert!(store.commit(TENANT, &stale, writes).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_mid_commit_leaves_nothing() {
        let store = MemoryStore::new();
        store.put(TENANT, &client("c0", 0)).await.unwrap();
        store.fail_after_writes(2).unwrap();

        let mut writes = WriteSet::new();
        for id in ["c1", "c2", "c3"] {
            writes.put(&client(id, 1)).unwrap();
        }
        let err = store
            .commit(TENANT, &Snapshot::new(), writes)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));
        assert_eq!(store.document_count(TENANT).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_transaction_retries_then_succeeds() {
        let store = MemoryStore::new();
        store.put(TENANT, &client("c1", 0)).await.unwrap();
        store.inject_conflicts(2).unwrap();

        let reads = ReadSet::new().doc::<Client>("c1");
        let mut calls = 0;
        let debt = run_transaction(&store, TENANT, &reads, 5, |snapshot| {
            calls += 1;
            let mut c: Client = snapshot.require("c1")?;
            c.current_debt_cents += 100;
            let mut writes = WriteSet::new();
            writes.put(&c)?;
            Ok(Plan::new(writes, c.current_debt_cents))
        })
        .await
        .unwrap();

        assert_eq!(debt, 100);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_run_transaction_gives_up() {
        let store = MemoryStore::new();
        store.inject_conflicts(10).unwrap();

        let reads = ReadSet::new().doc::<Client>("c1");
        let err = run_transaction(&store, TENANT, &reads, 3, |_| {
            let mut writes = WriteSet::new();
            writes.put(&client("c1", 0))?;
            Ok(Plan::new(writes, ()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::RetriesExhausted { attempts: 3 }));
        assert!(store.get::<Client>(TENANT, "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plan_errors_are_not_retried() {
        let store = MemoryStore::new();
        let reads = ReadSet::new().doc::<Client>("ghost");
        let mut calls = 0;
        let err = run_transaction(&store, TENANT, &reads, 5, |snapshot| {
            calls += 1;
            let c: Client = snapshot.require("ghost")?;
            Ok(Plan::read_only(c))
        })
        .await
        .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, DbError::Rejected(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_commit_broadcasts_change() {
        let store = MemoryStore::new();
        let mut rx = store.changes();
        store.put(TENANT, &client("c1", 0)).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.touches(TENANT, Collection::Clients));
        assert!(!event.touches("other", Collection::Clients));
    }
}
