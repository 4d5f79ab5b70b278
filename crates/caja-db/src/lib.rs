//! # caja-db: Transactional Store for Caja POS
//!
//! This crate runs caja-core's planning functions as atomic conditional
//! transactions against a versioned document store.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  Command (checkout, pay_receivable, ...)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caja-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ LedgerEngine  │    │  LedgerStore  │    │ Subscription │  │   │
//! │  │   │ (engine.rs)   │───►│ MemoryStore   │───►│ full set on  │  │   │
//! │  │   │ validate,     │    │ SqliteStore   │    │ every change │  │   │
//! │  │   │ mint ids, run │    │ read / commit │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           SQLite (documents + collection_versions)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - The `LedgerStore` contract, the retry loop, both stores
//! - [`engine`] - `LedgerEngine`, one method per ledger operation
//! - [`subscription`] - Push-based collection views
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{DbConfig, LedgerEngine, SqliteStore};
//!
//! let store = SqliteStore::connect(DbConfig::new("caja.db")).await?;
//! let engine = LedgerEngine::new(store, tenant_id);
//!
//! let sale = engine.commit_sale(request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;
pub mod subscription;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{EngineConfig, LedgerEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::memory::MemoryStore;
pub use store::sqlite::SqliteStore;
pub use store::{run_transaction, ChangeEvent, LedgerStore, DEFAULT_MAX_ATTEMPTS};
pub use subscription::Subscription;
