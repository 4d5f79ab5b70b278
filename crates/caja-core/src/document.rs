//! # Document Contract
//!
//! The typed read-set / write-set contract every ledger transaction goes
//! through.
//!
//! ## Transaction Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ReadSet ─────────► store.read() ─────────► Snapshot                  │
//! │   { keys, scans }                            { key → (version, body) } │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                      plan_xxx(&Snapshot, args, now)     │
//! │                                                      │                  │
//! │                              Err(CoreError) ◄────────┤                  │
//! │                              (abort, no writes)      ▼                  │
//! │                                              Plan { writes, value }     │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │   store.commit(&Snapshot, WriteSet)                                     │
//! │   ├── every read version unchanged → apply all writes, bump versions   │
//! │   └── any version moved            → Conflict (caller retries)         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plans only see what their read set named. Reading anything else fails
//! with `CoreError::NotInReadSet`, so a plan can never act on a value the
//! commit check does not cover.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Per-document (and per-collection) write counter.
///
/// Absent documents have no version; the first write creates version 1.
pub type Version = u64;

// =============================================================================
// Collection
// =============================================================================

/// The collections a tenant owns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Inventory,
    Clients,
    Sales,
    Receivables,
    Payables,
    CashAccount,
}

impl Collection {
    /// Every collection, in storage order.
    pub const ALL: [Collection; 6] = [
        Collection::Inventory,
        Collection::Clients,
        Collection::Sales,
        Collection::Receivables,
        Collection::Payables,
        Collection::CashAccount,
    ];

    /// Name used as the storage column value.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Inventory => "inventory",
            Collection::Clients => "clients",
            Collection::Sales => "sales",
            Collection::Receivables => "receivables",
            Collection::Payables => "payables",
            Collection::CashAccount => "cash_account",
        }
    }

    /// Parses a storage name back into a collection.
    pub fn parse(name: &str) -> Option<Self> {
        Collection::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Singular entity name for error messages.
    pub const fn entity_name(&self) -> &'static str {
        match self {
            Collection::Inventory => "Item",
            Collection::Clients => "Client",
            Collection::Sales => "Sale",
            Collection::Receivables => "Receivable",
            Collection::Payables => "Payable",
            Collection::CashAccount => "Cash account",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Document Key
// =============================================================================

/// Address of one document inside a tenant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocKey {
    pub collection: Collection,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        DocKey {
            collection,
            id: id.into(),
        }
    }

    /// Key of document `id` in `D`'s collection.
    pub fn of<D: Document>(id: impl Into<String>) -> Self {
        DocKey::new(D::COLLECTION, id)
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

// =============================================================================
// Document Trait
// =============================================================================

/// A record stored as a JSON body under a [`DocKey`].
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection every instance lives in.
    const COLLECTION: Collection;

    /// The document id inside its collection.
    fn doc_id(&self) -> &str;

    fn key(&self) -> DocKey {
        DocKey::new(Self::COLLECTION, self.doc_id())
    }
}

/// Encodes a document into its stored body.
pub fn encode<D: Document>(doc: &D) -> CoreResult<Value> {
    serde_json::to_value(doc).map_err(|e| CoreError::MalformedDocument {
        key: doc.key().to_string(),
        reason: e.to_string(),
    })
}

/// Decodes a stored body.
pub fn decode<D: Document>(key: &DocKey, body: &Value) -> CoreResult<D> {
    D::deserialize(body).map_err(|e| CoreError::MalformedDocument {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Read Set
// =============================================================================

/// What a transaction reads: explicit keys plus whole-collection scans.
///
/// A scan covers membership too. Any insert or delete in a scanned
/// collection invalidates the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSet {
    keys: BTreeSet<DocKey>,
    scans: BTreeSet<Collection>,
}

impl ReadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds document `id` of type `D`.
    pub fn doc<D: Document>(mut self, id: impl Into<String>) -> Self {
        self.keys.insert(DocKey::of::<D>(id));
        self
    }

    /// Adds a raw key.
    pub fn key(mut self, key: DocKey) -> Self {
        self.keys.insert(key);
        self
    }

    /// Adds a scan of a whole collection.
    pub fn scan(mut self, collection: Collection) -> Self {
        self.scans.insert(collection);
        self
    }

    pub fn insert_key(&mut self, key: DocKey) {
        self.keys.insert(key);
    }

    pub fn merge(mut self, other: ReadSet) -> Self {
        self.keys.extend(other.keys);
        self.scans.extend(other.scans);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &DocKey> {
        self.keys.iter()
    }

    pub fn scans(&self) -> impl Iterator<Item = Collection> + '_ {
        self.scans.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.scans.is_empty()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// A stored body and the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub version: Version,
    pub body: Value,
}

/// Every document of one collection, plus the collection version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionScan {
    pub version: Version,
    pub docs: BTreeMap<String, VersionedDoc>,
}

/// Consistent view of everything a [`ReadSet`] named.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    docs: BTreeMap<DocKey, Option<VersionedDoc>>,
    scans: BTreeMap<Collection, CollectionScan>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a key read; `None` means the document was absent.
    pub fn insert_doc(&mut self, key: DocKey, doc: Option<VersionedDoc>) {
        self.docs.insert(key, doc);
    }

    /// Records a collection scan.
    pub fn insert_scan(&mut self, collection: Collection, scan: CollectionScan) {
        self.scans.insert(collection, scan);
    }

    /// Versions of every explicitly read key (`None` = absent).
    pub fn key_versions(&self) -> impl Iterator<Item = (&DocKey, Option<Version>)> {
        self.docs
            .iter()
            .map(|(key, doc)| (key, doc.as_ref().map(|d| d.version)))
    }

    /// Versions of every scanned collection.
    pub fn scan_versions(&self) -> impl Iterator<Item = (Collection, Version)> + '_ {
        self.scans.iter().map(|(c, scan)| (*c, scan.version))
    }

    fn lookup(&self, key: &DocKey) -> CoreResult<Option<&VersionedDoc>> {
        if let Some(doc) = self.docs.get(key) {
            return Ok(doc.as_ref());
        }
        match self.scans.get(&key.collection) {
            Some(scan) => Ok(scan.docs.get(&key.id)),
            None => Err(CoreError::NotInReadSet {
                key: key.to_string(),
            }),
        }
    }

    /// Reads document `id` of type `D`; `Ok(None)` when absent.
    pub fn get<D: Document>(&self, id: &str) -> CoreResult<Option<D>> {
        let key = DocKey::of::<D>(id);
        match self.lookup(&key)? {
            Some(doc) => decode(&key, &doc.body).map(Some),
            None => Ok(None),
        }
    }

    /// Reads document `id`, failing with `NotFound` when absent.
    pub fn require<D: Document>(&self, id: &str) -> CoreResult<D> {
        self.get::<D>(id)?
            .ok_or_else(|| CoreError::not_found(D::COLLECTION.entity_name(), id))
    }

    /// Every document of `D`'s collection, ordered by id.
    pub fn scan<D: Document>(&self) -> CoreResult<Vec<D>> {
        let scan = self
            .scans
            .get(&D::COLLECTION)
            .ok_or_else(|| CoreError::NotInReadSet {
                key: format!("{}/*", D::COLLECTION),
            })?;

        scan.docs
            .iter()
            .map(|(id, doc)| decode(&DocKey::of::<D>(id.as_str()), &doc.body))
            .collect()
    }

    /// Version a key was read at, if it was read and present.
    pub fn version_of(&self, key: &DocKey) -> Option<Version> {
        self.lookup(key).ok().flatten().map(|d| d.version)
    }
}

// =============================================================================
// Write Set
// =============================================================================

/// Puts and deletes a transaction commits together.
///
/// `Some(body)` is a put, `None` a delete. The last write to a key wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    ops: BTreeMap<DocKey, Option<Value>>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a put of `doc`.
    pub fn put<D: Document>(&mut self, doc: &D) -> CoreResult<()> {
        let body = encode(doc)?;
        self.ops.insert(doc.key(), Some(body));
        Ok(())
    }

    /// Stages a delete of document `id` of type `D`.
    pub fn delete<D: Document>(&mut self, id: impl Into<String>) {
        self.ops.insert(DocKey::of::<D>(id), None);
    }

    pub fn put_raw(&mut self, key: DocKey, body: Value) {
        self.ops.insert(key, Some(body));
    }

    pub fn delete_key(&mut self, key: DocKey) {
        self.ops.insert(key, None);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocKey, Option<&Value>)> {
        self.ops.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Collections this write set touches.
    pub fn collections(&self) -> BTreeSet<Collection> {
        self.ops.keys().map(|k| k.collection).collect()
    }

    pub fn contains(&self, key: &DocKey) -> bool {
        self.ops.contains_key(key)
    }
}

impl IntoIterator for WriteSet {
    type Item = (DocKey, Option<Value>);
    type IntoIter = std::collections::btree_map::IntoIter<DocKey, Option<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

// =============================================================================
// Plan
// =============================================================================

/// What a planning function hands back: writes to commit and the value the
/// caller receives once they commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan<T> {
    pub writes: WriteSet,
    pub value: T,
}

impl<T> Plan<T> {
    pub fn new(writes: WriteSet, value: T) -> Self {
        Plan { writes, value }
    }

    /// A plan that commits nothing.
    pub fn read_only(value: T) -> Self {
        Plan {
            writes: WriteSet::new(),
            value,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Client;
    use chrono::Utc;

    fn client(id: &str, debt: i64) -> Client {
        let mut client = Client::new(id, "Ana", Utc::now());
        client.current_debt_cents = debt;
        client
    }

    fn snapshot_with(client: &Client, version: Version) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert_doc(
            client.key(),
            Some(VersionedDoc {
                version,
                body: encode(client).unwrap(),
            }),
        );
        snapshot
    }

    #[test]
    fn test_collection_names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::parse(c.as_str()), Some(c));
        }
        assert_eq!(Collection::parse("nope"), None);
    }

    #[test]
    fn test_snapshot_typed_get() {
        let c = client("c1", 500);
        let snapshot = snapshot_with(&c, 3);

        let read: Client = snapshot.require("c1").unwrap();
        assert_eq!(read.current_debt_cents, 500);
        assert_eq!(snapshot.version_of(&c.key()), Some(3));
    }

    #[test]
    fn test_snapshot_rejects_keys_outside_read_set() {
        let snapshot = snapshot_with(&client("c1", 0), 1);
        let err = snapshot.get::<Client>("c2").unwrap_err();
        assert!(matches!(err, CoreError::NotInReadSet { .. }));
        assert!(matches!(
            snapshot.scan::<Client>(),
            Err(CoreError::NotInReadSet { .. })
        ));
    }

    #[test]
    fn test_absent_key_is_none_and_require_is_not_found() {
        let mut snapshot = Snapshot::new();
        snapshot.insert_doc(DocKey::of::<Client>("ghost"), None);

        assert_eq!(snapshot.get::<Client>("ghost").unwrap().map(|c| c.id), None);
        assert!(matches!(
            snapshot.require::<Client>("ghost"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_scan_covers_members_and_absentees() {
        let a = client("a", 1);
        let b = client("b", 2);
        let mut docs = BTreeMap::new();
        for c in [&a, &b] {
            docs.insert(
                c.id.clone(),
                VersionedDoc {
                    version: 1,
                    body: encode(c).unwrap(),
                },
            );
        }
        let mut snapshot = Snapshot::new();
        snapshot.insert_scan(Collection::Clients, CollectionScan { version: 2, docs });

        let all: Vec<Client> = snapshot.scan().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(snapshot.get::<Client>("b").unwrap().unwrap().current_debt_cents, 2);
        assert!(snapshot.get::<Client>("zzz").unwrap().is_none());
    }

    #[test]
    fn test_malformed_body() {
        let mut snapshot = Snapshot::new();
        snapshot.insert_doc(
            DocKey::of::<Client>("bad"),
            Some(VersionedDoc {
                version: 1,
                body: serde_json::json!({ "id": 42 }),
            }),
        );
        assert!(matches!(
            snapshot.get::<Client>("bad"),
            Err(CoreError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_write_set_last_write_wins() {
        let mut writes = WriteSet::new();
        writes.put(&client("c1", 10)).unwrap();
        writes.delete::<Client>("c1");
        writes.put(&client("c2", 20)).unwrap();

        assert_eq!(writes.len(), 2);
        let ops: Vec<_> = writes.iter().map(|(k, v)| (k.id.clone(), v.is_some())).collect();
        assert_eq!(ops, vec![("c1".to_string(), false), ("c2".to_string(), true)]);
        assert_eq!(
            writes.collections().into_iter().collect::<Vec<_>>(),
            vec![Collection::Clients]
        );
    }
}
