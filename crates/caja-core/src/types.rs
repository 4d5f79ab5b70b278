//! # Domain Types
//!
//! Records kept per tenant by Caja POS.
//!
//! ## Record Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Records                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InventoryItem  │   │      Sale       │   │   Receivable    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code (key)     │◄──│  items[].code   │   │  sale_id ───────┼──► Sale│
//! │  │  qty on hand    │   │  client_id ─────┼─┐ │  client_id ─────┼─┐     │
//! │  │  unit / total   │   │  sale_type      │ │ │  balance        │ │     │
//! │  │  cost (Decimal) │   │  subtotal       │ │ │  deferred util. │ │     │
//! │  └─────────────────┘   └─────────────────┘ │ └─────────────────┘ │     │
//! │                                            ▼                     ▼     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CashAccount   │   │     Payable     │   │     Client      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id = "main"    │   │  provider       │   │  current_debt = │       │
//! │  │  initial        │   │  concept        │   │  Σ open receiv. │       │
//! │  │  current        │   │  balance        │   │    balances     │       │
//! │  │  total profit   │   │  payments[]     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record is a [`Document`]; tenants namespace them at the store.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{Collection, Document};
use crate::money::{MarginRate, Money};
use crate::CASH_ACCOUNT_ID;

// =============================================================================
// Inventory Item
// =============================================================================

/// A stocked item valued at moving-average cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryItem {
    /// Business key, unique per tenant.
    pub code: String,

    pub description: String,

    /// Units on hand, never negative.
    pub quantity_on_hand: i64,

    /// Moving-average unit cost in cents.
    #[ts(type = "string")]
    pub unit_cost_cents: Decimal,

    /// `quantity_on_hand × unit_cost_cents`.
    #[ts(type = "string")]
    pub total_cost_cents: Decimal,

    /// `unit_cost × (1 + margin)`, rounded to cents.
    pub sale_price_cents: i64,

    /// Markup in basis points (3000 = 30%).
    pub margin_bps: u32,

    /// Opaque reference produced by the image collaborator.
    pub image_ref: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// A new item with no stock.
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        margin: MarginRate,
        now: DateTime<Utc>,
    ) -> Self {
        InventoryItem {
            code: code.into(),
            description: description.into(),
            quantity_on_hand: 0,
            unit_cost_cents: Decimal::ZERO,
            total_cost_cents: Decimal::ZERO,
            sale_price_cents: 0,
            margin_bps: margin.bps(),
            image_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn margin(&self) -> MarginRate {
        MarginRate::from_bps(self.margin_bps)
    }

    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Stock valuation rounded to cents.
    pub fn stock_value(&self) -> Money {
        Money::from_decimal_cents(self.total_cost_cents)
    }

    /// `|qty × unit − total|` in cents.
    pub fn valuation_drift(&self) -> Decimal {
        (Decimal::from(self.quantity_on_hand) * self.unit_cost_cents - self.total_cost_cents).abs()
    }
}

impl Document for InventoryItem {
    const COLLECTION: Collection = Collection::Inventory;

    fn doc_id(&self) -> &str {
        &self.code
    }
}

// =============================================================================
// Cash Account
// =============================================================================

/// The per-tenant drawer: initial capital, current capital, total profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashAccount {
    /// Always [`CASH_ACCOUNT_ID`].
    pub id: String,
    pub initial_capital_cents: i64,
    pub current_capital_cents: i64,
    pub total_profit_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashAccount {
    /// A zeroed account, used when the singleton does not exist yet.
    pub fn empty(now: DateTime<Utc>) -> Self {
        CashAccount {
            id: CASH_ACCOUNT_ID.to_string(),
            initial_capital_cents: 0,
            current_capital_cents: 0,
            total_profit_cents: 0,
            updated_at: now,
        }
    }

    #[inline]
    pub fn initial_capital(&self) -> Money {
        Money::from_cents(self.initial_capital_cents)
    }

    #[inline]
    pub fn current_capital(&self) -> Money {
        Money::from_cents(self.current_capital_cents)
    }

    #[inline]
    pub fn total_profit(&self) -> Money {
        Money::from_cents(self.total_profit_cents)
    }

    /// True once any field holds money.
    pub fn is_initialized(&self) -> bool {
        self.initial_capital_cents != 0
            || self.current_capital_cents != 0
            || self.total_profit_cents != 0
    }
}

impl Document for CashAccount {
    const COLLECTION: Collection = Collection::CashAccount;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Sale
// =============================================================================

/// How a sale is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    /// Paid at the counter; cash and profit move immediately.
    Cash,
    /// On account; creates a receivable and defers the profit.
    Credit,
}

impl Default for SaleType {
    fn default() -> Self {
        SaleType::Cash
    }
}

/// A line of a committed sale.
/// Price and cost are frozen at the moment of the sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(type = "string")]
    pub unit_cost_cents: Decimal,
}

impl SaleLine {
    /// `unit_price × quantity`.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// `unit_cost × quantity`, unrounded.
    pub fn line_cost(&self) -> Decimal {
        self.unit_cost_cents * Decimal::from(self.quantity)
    }
}

/// An append-only sale record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub client_id: String,
    pub sale_type: SaleType,
    pub items: Vec<SaleLine>,
    pub subtotal_cents: i64,
    /// Σ line cost rounded to cents.
    pub total_cost_cents: i64,
    /// `subtotal − total_cost`.
    pub total_utility_cents: i64,
    /// Set for credit sales.
    pub receivable_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total_utility(&self) -> Money {
        Money::from_cents(self.total_utility_cents)
    }
}

impl Document for Sale {
    const COLLECTION: Collection = Collection::Sales;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Settlement Status
// =============================================================================

/// Lifecycle shared by receivables and payables.
///
/// ```text
/// Open ──► Partial ──► Settled
///   └──────────────────►┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Open,
    Partial,
    Settled,
}

impl SettlementStatus {
    #[inline]
    pub fn is_settled(&self) -> bool {
        matches!(self, SettlementStatus::Settled)
    }

    /// Whether `self → next` follows the lifecycle (no backwards moves).
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (self, next),
            (Open, Partial) | (Open, Settled) | (Partial, Partial) | (Partial, Settled)
        )
    }
}

impl Default for SettlementStatus {
    fn default() -> Self {
        SettlementStatus::Open
    }
}

/// One payment ("abono") against a receivable or payable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentEntry {
    pub amount_cents: i64,
    /// Balance left after this payment, before any write-off.
    pub balance_after_cents: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Receivable
// =============================================================================

/// Money a client owes for one credit sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Receivable {
    pub id: String,
    pub client_id: String,
    /// The credit sale this receivable was created by.
    pub sale_id: String,
    pub original_amount_cents: i64,
    pub current_balance_cents: i64,
    /// Profit recognized when the receivable settles.
    pub deferred_utility_cents: i64,
    pub status: SettlementStatus,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Receivable {
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    /// Σ of every payment received.
    pub fn total_paid(&self) -> Money {
        self.payments
            .iter()
            .map(|p| Money::from_cents(p.amount_cents))
            .sum()
    }
}

impl Document for Receivable {
    const COLLECTION: Collection = Collection::Receivables;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Payable
// =============================================================================

/// An expense owed to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payable {
    pub id: String,
    pub provider: String,
    pub concept: String,
    pub original_amount_cents: i64,
    pub current_balance_cents: i64,
    pub status: SettlementStatus,
    #[serde(default)]
    pub payments: Vec<PaymentEntry>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub settled_at: Option<DateTime<Utc>>,
}

impl Payable {
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }
}

impl Document for Payable {
    const COLLECTION: Collection = Collection::Payables;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Client
// =============================================================================

/// A customer who may buy on credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Σ of this client's open receivable balances.
    pub current_debt_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(id: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Client {
            id: id.into(),
            name: name.into(),
            current_debt_cents: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn current_debt(&self) -> Money {
        Money::from_cents(self.current_debt_cents)
    }
}

impl Document for Client {
    const COLLECTION: Collection = Collection::Clients;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Payment Selectors
// =============================================================================

/// Which kind of record a payment is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Receivable,
    Payable,
}

/// Where money leaving the drawer is booked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawSource {
    /// Also reduces total profit; limited by it.
    Profit,
    /// Also reduces initial capital; limited by it.
    Capital,
}

impl WithdrawSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            WithdrawSource::Profit => "profit",
            WithdrawSource::Capital => "capital",
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
