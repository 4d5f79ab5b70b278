//! # Collection Subscriptions
//!
//! Push-based views of one collection.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Subscription::<Client>::new(&store, tenant)                           │
//! │       │  (subscribes to store.changes() before the first list)         │
//! │       ▼                                                                 │
//! │  next() #1 ──► full current set                                        │
//! │  next() #2 ──► waits for a ChangeEvent touching (tenant, clients)      │
//! │                 ──► full current set again                             │
//! │                                                                         │
//! │  Lagged receiver ──► warn!, re-list (nothing is lost: sets are full)   │
//! │  Store gone      ──► None                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::marker::PhantomData;

use caja_core::Document;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::error::DbResult;
use crate::store::{ChangeEvent, LedgerStore};

/// Stream of record sets for `D`'s collection.
pub struct Subscription<S: LedgerStore, D: Document> {
    store: S,
    tenant: String,
    receiver: broadcast::Receiver<ChangeEvent>,
    primed: bool,
    _doc: PhantomData<fn() -> D>,
}

impl<S: LedgerStore, D: Document> Subscription<S, D> {
    pub fn new(store: &S, tenant: impl Into<String>) -> Self {
        let tenant = tenant.into();
        debug!(tenant = %tenant, collection = %D::COLLECTION, "Subscription opened");
        Subscription {
            receiver: store.changes(),
            store: store.clone(),
            tenant,
            primed: false,
            _doc: PhantomData,
        }
    }

    /// Waits for the next record set.
    ///
    /// The first call returns immediately with the current set.
    pub async fn next(&mut self) -> Option<DbResult<Vec<D>>> {
        if !self.primed {
            self.primed = true;
            return Some(self.store.list::<D>(&self.tenant).await);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) if event.touches(&self.tenant, D::COLLECTION) => {
                    return Some(self.store.list::<D>(&self.tenant).await);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        tenant = %self.tenant,
                        collection = %D::COLLECTION,
                        skipped,
                        "Subscription lagged, re-listing"
                    );
                    return Some(self.store.list::<D>(&self.tenant).await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use caja_core::{CashAccount, Client};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_first_set_then_updates() {
        let store = MemoryStore::new();
        store.put("t1", &Client::new("c1", "Ana", Utc::now())).await.unwrap();

        let mut sub = Subscription::<_, Client>::new(&store, "t1");
        let first = sub.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.put("t1", &Client::new("c2", "Luis", Utc::now())).await.unwrap();
        let second = timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn test_ignores_other_collections_and_tenants() {
        let store = MemoryStore::new();
        let mut sub = Subscription::<_, Client>::new(&store, "t1");
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        store.put("t1", &CashAccount::empty(Utc::now())).await.unwrap();
        store.put("t2", &Client::new("x", "Other", Utc::now())).await.unwrap();

        let waited = timeout(Duration::from_millis(50), sub.next()).await;
        assert!(waited.is_err());
    }
}
