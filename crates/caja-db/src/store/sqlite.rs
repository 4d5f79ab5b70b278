//! # SQLite Store
//!
//! Durable [`LedgerStore`] on top of the sqlx pool.
//!
//! ## Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    for each read key:    SELECT version  ── differs? ──► Conflict      │
//! │    for each scan:        SELECT collection version ── differs? ──►     │
//! │    for each written collection:                                         │
//! │        UPSERT collection_versions SET version = version + 1            │
//! │    for each write:       UPSERT / DELETE documents                     │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  SQLITE_BUSY at any step ──► Conflict (the loop retries)               │
//! │  any other error         ──► ROLLBACK on drop, error returned          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use caja_core::document::{CollectionScan, DocKey, VersionedDoc};
use caja_core::{Collection, CoreError, ReadSet, Snapshot, Version, WriteSet};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeEvent, LedgerStore, CHANGE_CHANNEL_CAPACITY};
use crate::error::{DbError, DbResult};
use crate::pool::{Database, DbConfig};

/// Ledger store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
    changes: broadcast::Sender<ChangeEvent>,
}

impl SqliteStore {
    /// Opens (and migrates) the database described by `config`.
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        let db = Database::new(config).await?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        SqliteStore { db, changes }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Number of documents stored for a tenant.
    pub async fn document_count(&self, tenant: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE tenant_id = ?")
            .bind(tenant)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn read_tx(&self, tenant: &str, reads: &ReadSet) -> DbResult<Snapshot> {
        let mut tx = self.db.pool().begin().await?;
        let mut snapshot = Snapshot::new();

        for key in reads.keys() {
            let row = sqlx::query(
                "SELECT version, body FROM documents \
                 WHERE tenant_id = ? AND collection = ? AND id = ?",
            )
            .bind(tenant)
            .bind(key.collection.as_str())
            .bind(&key.id)
            .fetch_optional(&mut *tx)
            .await?;

            let doc = match row {
                Some(row) => Some(versioned_doc(key, &row)?),
                None => None,
            };
            snapshot.insert_doc(key.clone(), doc);
        }

        for collection in reads.scans() {
            let version = collection_version(&mut tx, tenant, collection).await?;
            let rows = sqlx::query(
                "SELECT id, version, body FROM documents \
                 WHERE tenant_id = ? AND collection = ? ORDER BY id",
            )
            .bind(tenant)
            .bind(collection.as_str())
            .fetch_all(&mut *tx)
            .await?;

            let mut docs = BTreeMap::new();
            for row in rows {
                let id: String = row.try_get("id")?;
                let key = DocKey::new(collection, id.clone());
                docs.insert(id, versioned_doc(&key, &row)?);
            }
            snapshot.insert_scan(collection, CollectionScan { version, docs });
        }

        tx.commit().await?;
        Ok(snapshot)
    }

    async fn commit_tx(&self, tenant: &str, snapshot: &Snapshot, writes: WriteSet) -> DbResult<()> {
        let collections = writes.collections();
        let mut tx = self.db.pool().begin().await?;

        for (key, expected) in snapshot.key_versions() {
            let actual: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents \
                 WHERE tenant_id = ? AND collection = ? AND id = ?",
            )
            .bind(tenant)
            .bind(key.collection.as_str())
            .bind(&key.id)
            .fetch_optional(&mut *tx)
            .await?;

            if actual.map(|v| v as Version) != expected {
                return Err(DbError::Conflict(format!("{key} changed")));
            }
        }

        for (collection, expected) in snapshot.scan_versions() {
            if collection_version(&mut tx, tenant, collection).await? != expected {
                return Err(DbError::Conflict(format!("{collection} changed")));
            }
        }

        let mut stamped: HashMap<Collection, i64> = HashMap::new();
        for collection in &collections {
            let version: i64 = sqlx::query_scalar(
                "INSERT INTO collection_versions (tenant_id, collection, version) \
                 VALUES (?, ?, 1) \
                 ON CONFLICT (tenant_id, collection) DO UPDATE SET version = version + 1 \
                 RETURNING version",
            )
            .bind(tenant)
            .bind(collection.as_str())
            .fetch_one(&mut *tx)
            .await?;
            stamped.insert(*collection, version);
        }

        let now = Utc::now().to_rfc3339();
        for (key, body) in writes {
            match body {
                Some(body) => {
                    let version = stamped.get(&key.collection).copied().unwrap_or(1);
                    let text = serde_json::to_string(&body).map_err(|e| {
                        CoreError::MalformedDocument {
                            key: key.to_string(),
                            reason: e.to_string(),
                        }
                    })?;
                    sqlx::query(
                        "INSERT INTO documents (tenant_id, collection, id, version, body, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?) \
                         ON CONFLICT (tenant_id, collection, id) DO UPDATE SET \
                             version = excluded.version, \
                             body = excluded.body, \
                             updated_at = excluded.updated_at",
                    )
                    .bind(tenant)
                    .bind(key.collection.as_str())
                    .bind(&key.id)
                    .bind(version)
                    .bind(text)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query(
                        "DELETE FROM documents WHERE tenant_id = ? AND collection = ? AND id = ?",
                    )
                    .bind(tenant)
                    .bind(key.collection.as_str())
                    .bind(&key.id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;

        if !collections.is_empty() {
            debug!(tenant, ?collections, "SQLite commit applied");
            let _ = self.changes.send(ChangeEvent {
                tenant: tenant.to_string(),
                collections,
            });
        }
        Ok(())
    }
}

fn versioned_doc(key: &DocKey, row: &SqliteRow) -> DbResult<VersionedDoc> {
    let version: i64 = row.try_get("version")?;
    let body: String = row.try_get("body")?;
    let body: Value = serde_json::from_str(&body).map_err(|e| CoreError::MalformedDocument {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(VersionedDoc {
        version: version as Version,
        body,
    })
}

async fn collection_version(
    tx: &mut Transaction<'_, Sqlite>,
    tenant: &str,
    collection: Collection,
) -> DbResult<Version> {
    let version: Option<i64> = sqlx::query_scalar(
        "SELECT version FROM collection_versions WHERE tenant_id = ? AND collection = ?",
    )
    .bind(tenant)
    .bind(collection.as_str())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(version.unwrap_or(0) as Version)
}

impl LedgerStore for SqliteStore {
    async fn read(&self, tenant: &str, reads: &ReadSet) -> DbResult<Snapshot> {
        self.read_tx(tenant, reads).await
    }

    async fn commit(&self, tenant: &str, snapshot: &Snapshot, writes: WriteSet) -> DbResult<()> {
        self.commit_tx(tenant, snapshot, writes).await
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
