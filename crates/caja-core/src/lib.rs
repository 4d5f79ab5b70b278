//! # caja-core: Pure Ledger Rules for Caja POS
//!
//! This crate holds every rule that keeps the cash drawer, profit,
//! receivables, payables and client debt consistent. It performs no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/caja (reducer + commands)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              caja-db (LedgerEngine + LedgerStore)               │   │
//! │  │      read(ReadSet) ──► plan(&Snapshot) ──► commit(WriteSet)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plan functions                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ document  │  │  ledger   │  │   │
//! │  │   │  records  │  │   Money   │  │  ReadSet  │  │ inventory │  │   │
//! │  │   │  status   │  │ Margin    │  │  Snapshot │  │ sale      │  │   │
//! │  │   │           │  │           │  │  WriteSet │  │ settle... │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (InventoryItem, CashAccount, Sale, Receivable, ...)
//! - [`money`] - Money in integer cents, margins in basis points
//! - [`document`] - The typed read-set / write-set transaction contract
//! - [`ledger`] - Planning functions for every ledger operation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation run before any transaction
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::{MarginRate, Money};
//! use rust_decimal::Decimal;
//!
//! // 30% margin over a 200-cent unit cost
//! let price = MarginRate::from_bps(3000).sale_price(Decimal::from(200));
//! assert_eq!(price, Money::from_cents(260));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod document;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use document::{Collection, DocKey, Document, Plan, ReadSet, Snapshot, Version, WriteSet};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{MarginRate, Money};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used when no identity collaborator supplies one.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Document id of the per-tenant cash account singleton.
pub const CASH_ACCOUNT_ID: &str = "main";

/// Maximum distinct lines in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;
