//! # Ledger Engine
//!
//! Binds the planning functions of `caja_core::ledger` to a store.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  engine.commit_sale(request)                                           │
//! │       │                                                                 │
//! │       ├── request.validate()        ← ValidationError, nothing read    │
//! │       ├── mint SaleIds              ← reused by every retry            │
//! │       │                                                                 │
//! │       └── run_transaction(store, tenant, request.read_set(), |snap| {  │
//! │               plan_sale(snap, &request, &ids, Utc::now())              │
//! │           })                                                            │
//! │             ├── Rejected(CoreError)   precondition failed, no writes   │
//! │             ├── RetriesExhausted      kept conflicting                 │
//! │             └── Ok(Sale)              every write committed            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine holds no cache. Reads go to the store; UI views come from
//! [`LedgerEngine::subscribe`].

use caja_core::ledger::{
    self, audit_reads, cash_account_reads, client_reads, item_reads, payable_reads,
    receivable_reads, reset_reads, AuditReport, ItemDetailsUpdate, LedgerSummary, NewItem,
    NewPayable, PaymentOutcome, PaymentRequest, ResetSummary, SaleIds, SaleRequest,
    SettlementPolicy, StockMovement,
};
use caja_core::validation::{validate_amount_cents, validate_client_name};
use caja_core::{
    CashAccount, Client, CoreError, CoreResult, Document, InventoryItem, Money, Payable, Plan,
    ReadSet, Receivable, RecordKind, Sale, Snapshot, WithdrawSource, CASH_ACCOUNT_ID,
};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{run_transaction, LedgerStore, DEFAULT_MAX_ATTEMPTS};
use crate::subscription::Subscription;

// =============================================================================
// Configuration
// =============================================================================

/// Tunables for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Attempts per transaction before giving up on conflicts.
    pub max_attempts: u32,
    pub policy: SettlementPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            policy: SettlementPolicy::default(),
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Ledger operations for one tenant.
#[derive(Debug, Clone)]
pub struct LedgerEngine<S: LedgerStore> {
    store: S,
    tenant: String,
    config: EngineConfig,
}

impl<S: LedgerStore> LedgerEngine<S> {
    pub fn new(store: S, tenant: impl Into<String>) -> Self {
        Self::with_config(store, tenant, EngineConfig::default())
    }

    pub fn with_config(store: S, tenant: impl Into<String>, config: EngineConfig) -> Self {
        LedgerEngine {
            store,
            tenant: tenant.into(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn transact<T, F>(&self, reads: &ReadSet, plan: F) -> DbResult<T>
    where
        F: FnMut(&Snapshot) -> CoreResult<Plan<T>>,
    {
        run_transaction(
            &self.store,
            &self.tenant,
            reads,
            self.config.max_attempts,
            plan,
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Inventory
    // -------------------------------------------------------------------------

    /// Registers a new item with its opening stock.
    pub async fn register_item(&self, new_item: NewItem) -> DbResult<InventoryItem> {
        new_item.validate()?;
        let code = new_item.code.trim().to_string();
        debug!(tenant = %self.tenant, code = %code, "Registering item");

        let item = self
            .transact(&item_reads(&code), |snapshot| {
                ledger::plan_register_item(snapshot, &new_item, Utc::now())
            })
            .await?;

        info!(
            tenant = %self.tenant,
            code = %item.code,
            quantity = item.quantity_on_hand,
            "Item registered"
        );
        Ok(item)
    }

    /// Restocks, consumes or revalues one item.
    pub async fn apply_stock_movement(
        &self,
        code: &str,
        movement: StockMovement,
    ) -> DbResult<InventoryItem> {
        movement.validate()?;
        debug!(tenant = %self.tenant, code, delta = movement.delta, "Applying stock movement");

        let item = self
            .transact(&item_reads(code), |snapshot| {
                ledger::plan_stock_movement(snapshot, code, &movement, Utc::now())
            })
            .await?;

        info!(
            tenant = %self.tenant,
            code,
            quantity = item.quantity_on_hand,
            unit_cost = %item.unit_cost_cents,
            "Stock movement applied"
        );
        Ok(item)
    }

    /// Edits description and image reference.
    pub async fn update_item_details(
        &self,
        code: &str,
        update: ItemDetailsUpdate,
    ) -> DbResult<InventoryItem> {
        debug!(tenant = %self.tenant, code, "Updating item details");
        self.transact(&item_reads(code), |snapshot| {
            ledger::plan_update_details(snapshot, code, &update, Utc::now())
        })
        .await
    }

    // -------------------------------------------------------------------------
    // Clients and Payables
    // -------------------------------------------------------------------------

    /// Creates a client with zero debt.
    pub async fn register_client(&self, name: &str) -> DbResult<Client> {
        validate_client_name(name)?;
        let id = Uuid::new_v4().to_string();

        let client = self
            .transact(&client_reads(&id), |snapshot| {
                ledger::plan_register_client(snapshot, &id, name, Utc::now())
            })
            .await?;

        info!(tenant = %self.tenant, client_id = %client.id, "Client registered");
        Ok(client)
    }

    /// Records money owed to a provider.
    pub async fn record_payable(&self, new_payable: NewPayable) -> DbResult<Payable> {
        new_payable.validate()?;
        let id = Uuid::new_v4().to_string();

        let payable = self
            .transact(&ReadSet::new().doc::<Payable>(id.as_str()), |snapshot| {
                ledger::plan_new_payable(snapshot, &id, &new_payable, Utc::now())
            })
            .await?;

        info!(
            tenant = %self.tenant,
            payable_id = %payable.id,
            amount = payable.original_amount_cents,
            "Payable recorded"
        );
        Ok(payable)
    }

    // -------------------------------------------------------------------------
    // Sales and Payments
    // -------------------------------------------------------------------------

    /// Commits a checkout: stock out, sale record, and either cash in or a
    /// receivable plus client debt. All or nothing.
    pub async fn commit_sale(&self, request: SaleRequest) -> DbResult<Sale> {
        request.validate()?;
        let ids = SaleIds {
            sale_id: Uuid::new_v4().to_string(),
            receivable_id: Uuid::new_v4().to_string(),
        };
        debug!(
            tenant = %self.tenant,
            sale_id = %ids.sale_id,
            lines = request.lines.len(),
            "Committing sale"
        );

        let sale = self
            .transact(&request.read_set(), |snapshot| {
                ledger::plan_sale(snapshot, &request, &ids, Utc::now())
            })
            .await?;

        info!(
            tenant = %self.tenant,
            sale_id = %sale.id,
            sale_type = ?sale.sale_type,
            subtotal = sale.subtotal_cents,
            utility = sale.total_utility_cents,
            "Sale committed"
        );
        Ok(sale)
    }

    /// Applies an abono to a receivable or payable.
    pub async fn apply_payment(&self, request: PaymentRequest) -> DbResult<PaymentOutcome> {
        request.validate()?;
        debug!(
            tenant = %self.tenant,
            record_id = %request.record_id,
            kind = ?request.kind,
            amount = request.amount.cents(),
            "Applying payment"
        );

        let policy = self.config.policy;
        let outcome = match request.kind {
            RecordKind::Receivable => {
                let receivable: Receivable = self
                    .store
                    .get(&self.tenant, &request.record_id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("Receivable", &request.record_id))?;
                let client_id = receivable.client_id;

                self.transact(
                    &receivable_reads(&request.record_id, &client_id),
                    |snapshot| {
                        ledger::plan_payment(
                            snapshot,
                            &request,
                            Some(client_id.as_str()),
                            &policy,
                            Utc::now(),
                        )
                    },
                )
                .await?
            }
            RecordKind::Payable => {
                self.transact(&payable_reads(&request.record_id), |snapshot| {
                    ledger::plan_payment(snapshot, &request, None, &policy, Utc::now())
                })
                .await?
            }
        };

        info!(
            tenant = %self.tenant,
            record_id = %outcome.record_id,
            amount = outcome.amount_cents,
            balance = outcome.new_balance_cents,
            status = ?outcome.status,
            profit_realized = outcome.profit_realized_cents,
            "Payment applied"
        );
        Ok(outcome)
    }

    // -------------------------------------------------------------------------
    // Cash Account
    // -------------------------------------------------------------------------

    pub async fn contribute(&self, amount: Money) -> DbResult<CashAccount> {
        validate_amount_cents("amount", amount.cents())?;
        let account = self
            .transact(&cash_account_reads(), |snapshot| {
                ledger::plan_contribute(snapshot, amount, Utc::now())
            })
            .await?;
        info!(tenant = %self.tenant, amount = amount.cents(), "Capital contributed");
        Ok(account)
    }

    /// Sets the opening capital; `force` resets an account that holds money.
    pub async fn set_initial_capital(&self, amount: Money, force: bool) -> DbResult<CashAccount> {
        validate_amount_cents("amount", amount.cents())?;
        let account = self
            .transact(&cash_account_reads(), |snapshot| {
                ledger::plan_set_initial(snapshot, amount, force, Utc::now())
            })
            .await?;
        info!(tenant = %self.tenant, amount = amount.cents(), force, "Initial capital set");
        Ok(account)
    }

    pub async fn withdraw(&self, amount: Money, source: WithdrawSource) -> DbResult<CashAccount> {
        validate_amount_cents("amount", amount.cents())?;
        let account = self
            .transact(&cash_account_reads(), |snapshot| {
                ledger::plan_withdraw(snapshot, amount, source, Utc::now())
            })
            .await?;
        info!(
            tenant = %self.tenant,
            amount = amount.cents(),
            source = source.as_str(),
            "Withdrawal recorded"
        );
        Ok(account)
    }

    /// The cash account, zeroed if it was never written.
    pub async fn cash_account(&self) -> DbResult<CashAccount> {
        Ok(self
            .store
            .get::<CashAccount>(&self.tenant, CASH_ACCOUNT_ID)
            .await?
            .unwrap_or_else(|| CashAccount::empty(Utc::now())))
    }

    // -------------------------------------------------------------------------
    // Maintenance and Reports
    // -------------------------------------------------------------------------

    /// Deletes every sale, receivable and payable and zeroes client debt in
    /// one batch. Inventory and the cash account are kept.
    pub async fn reset_ledger(&self) -> DbResult<ResetSummary> {
        info!(tenant = %self.tenant, "Resetting ledger");
        let summary = self
            .transact(&reset_reads(), |snapshot| {
                ledger::plan_reset(snapshot, Utc::now())
            })
            .await?;
        info!(
            tenant = %self.tenant,
            sales = summary.sales_deleted,
            receivables = summary.receivables_deleted,
            payables = summary.payables_deleted,
            clients = summary.clients_zeroed,
            "Ledger reset"
        );
        Ok(summary)
    }

    /// Cross-record consistency check over one snapshot.
    pub async fn audit(&self) -> DbResult<AuditReport> {
        let snapshot = self.store.read(&self.tenant, &audit_reads()).await?;
        let report = ledger::audit(&snapshot)?;
        if !report.is_clean() {
            warn!(
                tenant = %self.tenant,
                findings = report.findings.len(),
                "Ledger audit found inconsistencies"
            );
        }
        Ok(report)
    }

    pub async fn summary(&self) -> DbResult<LedgerSummary> {
        let snapshot = self.store.read(&self.tenant, &audit_reads()).await?;
        Ok(ledger::summarize(&snapshot)?)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub async fn item(&self, code: &str) -> DbResult<InventoryItem> {
        self.require(code).await
    }

    pub async fn client(&self, id: &str) -> DbResult<Client> {
        self.require(id).await
    }

    pub async fn receivable(&self, id: &str) -> DbResult<Receivable> {
        self.require(id).await
    }

    pub async fn payable(&self, id: &str) -> DbResult<Payable> {
        self.require(id).await
    }

    pub async fn items(&self) -> DbResult<Vec<InventoryItem>> {
        self.store.list(&self.tenant).await
    }

    pub async fn clients(&self) -> DbResult<Vec<Client>> {
        self.store.list(&self.tenant).await
    }

    pub async fn sales(&self) -> DbResult<Vec<Sale>> {
        self.store.list(&self.tenant).await
    }

    pub async fn receivables(&self) -> DbResult<Vec<Receivable>> {
        self.store.list(&self.tenant).await
    }

    pub async fn payables(&self) -> DbResult<Vec<Payable>> {
        self.store.list(&self.tenant).await
    }

    /// Push-based view of `D`'s collection for this tenant.
    pub fn subscribe<D: Document>(&self) -> Subscription<S, D> {
        Subscription::new(&self.store, self.tenant.clone())
    }

    async fn require<D: Document>(&self, id: &str) -> DbResult<D> {
        self.store
            .get::<D>(&self.tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found(D::COLLECTION.entity_name(), id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use caja_core::ledger::CartLine;
    use caja_core::{SaleType, SettlementStatus};
    use rust_decimal::Decimal;

    const TENANT: &str = "tenant-1";

    fn engine() -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(MemoryStore::new(), TENANT)
    }

    fn new_item(code: &str, qty: i64, unit_cost: i64, margin_bps: u32) -> NewItem {
        NewItem {
            code: code.to_string(),
            description: format!("Item {code}"),
            margin_bps,
            image_ref: None,
            initial_quantity: qty,
            initial_unit_cost_cents: Decimal::from(unit_cost),
        }
    }

    fn credit(client_id: &str, lines: Vec<CartLine>) -> SaleRequest {
        SaleRequest {
            client_id: Some(client_id.to_string()),
            sale_type: SaleType::Credit,
            lines,
        }
    }

    /// Two items priced so one of each is a $100 sale with $30 utility.
    async fn hundred_dollar_shop(engine: &LedgerEngine<MemoryStore>) -> Client {
        engine.register_item(new_item("A", 5, 5000, 4000)).await.unwrap();
        engine.register_item(new_item("B", 5, 2000, 5000)).await.unwrap();
        engine.register_client("Ana").await.unwrap()
    }

    #[tokio::test]
    async fn test_moving_average_example() {
        let engine = engine();
        engine.register_item(new_item("X", 0, 0, 0)).await.unwrap();

        engine
            .apply_stock_movement("X", StockMovement::restock(10, Decimal::from(200)))
            .await
            .unwrap();
        let item = engine
            .apply_stock_movement("X", StockMovement::restock(10, Decimal::from(400)))
            .await
            .unwrap();
        assert_eq!(item.unit_cost_cents, Decimal::from(300));
        assert_eq!(item.quantity_on_hand, 20);

        let item = engine
            .apply_stock_movement("X", StockMovement::consume(5))
            .await
            .unwrap();
        assert_eq!(item.quantity_on_hand, 15);
        assert_eq!(item.total_cost_cents, Decimal::from(4500));
    }

    #[tokio::test]
    async fn test_credit_sale_defers_profit_until_settled() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;

        let sale = engine
            .commit_sale(credit(
                &client.id,
                vec![CartLine::new("A", 1), CartLine::new("B", 1)],
            ))
            .await
            .unwrap();
        assert_eq!(sale.subtotal_cents, 10_000);
        assert_eq!(sale.total_utility_cents, 3_000);

        let receivable_id = sale.receivable_id.clone().unwrap();
        let receivable = engine.receivable(&receivable_id).await.unwrap();
        assert_eq!(receivable.current_balance_cents, 10_000);
        assert_eq!(receivable.deferred_utility_cents, 3_000);
        assert_eq!(engine.cash_account().await.unwrap().total_profit_cents, 0);
        assert_eq!(engine.client(&client.id).await.unwrap().current_debt_cents, 10_000);

        let first = engine
            .apply_payment(PaymentRequest::receivable(
                &receivable_id,
                Money::from_cents(6_000),
            ))
            .await
            .unwrap();
        assert_eq!(first.new_balance_cents, 4_000);
        assert_eq!(first.status, SettlementStatus::Partial);
        let account = engine.cash_account().await.unwrap();
        assert_eq!(account.current_capital_cents, 6_000);
        assert_eq!(account.total_profit_cents, 0);

        let second = engine
            .apply_payment(PaymentRequest::receivable(
                &receivable_id,
                Money::from_cents(4_000),
            ))
            .await
            .unwrap();
        assert_eq!(second.status, SettlementStatus::Settled);
        assert_eq!(second.profit_realized_cents, 3_000);

        let account = engine.cash_account().await.unwrap();
        assert_eq!(account.current_capital_cents, 10_000);
        assert_eq!(account.total_profit_cents, 3_000);
        assert_eq!(engine.client(&client.id).await.unwrap().current_debt_cents, 0);

        // No profit is recognized twice.
        let again = engine
            .apply_payment(PaymentRequest::receivable(&receivable_id, Money::from_cents(1)))
            .await
            .unwrap_err();
        assert!(matches!(
            again.as_core(),
            Some(CoreError::AlreadySettled { .. })
        ));
        assert!(engine.audit().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_overpay_keeps_debt_equal_to_open_balances() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;

        let small = engine
            .commit_sale(credit(&client.id, vec![CartLine::new("B", 1)]))
            .await
            .unwrap();
        let large = engine
            .commit_sale(credit(&client.id, vec![CartLine::new("A", 1)]))
            .await
            .unwrap();
        assert_eq!((small.subtotal_cents, large.subtotal_cents), (3_000, 7_000));

        let outcome = engine
            .apply_payment(PaymentRequest::receivable(
                small.receivable_id.as_deref().unwrap(),
                Money::from_cents(3_001),
            ))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::Settled);

        let open: i64 = engine
            .receivables()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.client_id == client.id && !r.status.is_settled())
            .map(|r| r.current_balance_cents)
            .sum();
        let debt = engine.client(&client.id).await.unwrap().current_debt_cents;
        assert_eq!(open, 7_000);
        assert_eq!(debt, open);
        assert_eq!(engine.cash_account().await.unwrap().current_capital_cents, 3_001);

        let report = engine.audit().await.unwrap();
        assert!(report.is_clean(), "{:?}", report.findings);
    }

    #[tokio::test]
    async fn test_cash_sale_moves_capital_and_profit() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;

        let sale = engine
            .commit_sale(SaleRequest {
                client_id: Some(client.id.clone()),
                sale_type: SaleType::Cash,
                lines: vec![CartLine::new("A", 2)],
            })
            .await
            .unwrap();
        assert!(sale.receivable_id.is_none());

        let account = engine.cash_account().await.unwrap();
        assert_eq!(account.current_capital_cents, 14_000);
        assert_eq!(account.total_profit_cents, 4_000);
        assert_eq!(engine.item("A").await.unwrap().quantity_on_hand, 3);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_nothing_behind() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;
        let before = engine.store().document_count(TENANT).unwrap();

        // Stock write staged, receivable/debt/sale not yet.
        engine.store().fail_after_writes(1).unwrap();
        let err = engine
            .commit_sale(credit(&client.id, vec![CartLine::new("A", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Internal(_)));

        assert_eq!(engine.store().document_count(TENANT).unwrap(), before);
        assert_eq!(engine.item("A").await.unwrap().quantity_on_hand, 5);
        assert_eq!(engine.client(&client.id).await.unwrap().current_debt_cents, 0);
        assert!(engine.receivables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected_without_writes() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;
        let commits = engine.store().commit_count().unwrap();

        let err = engine
            .commit_sale(credit(&client.id, vec![CartLine::new("A", 6)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));
        assert_eq!(engine.store().commit_count().unwrap(), commits);
    }

    #[tokio::test]
    async fn test_validation_happens_before_reads() {
        let engine = engine();
        let err = engine
            .commit_sale(credit("nobody", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InvalidSaleRequest { .. })
        ));

        let err = engine.contribute(Money::from_cents(0)).await.unwrap_err();
        assert!(err.as_core().is_some_and(CoreError::is_validation));
    }

    #[tokio::test]
    async fn test_conflicts_are_retried() {
        let engine = engine();
        engine.store().inject_conflicts(2).unwrap();
        let account = engine.contribute(Money::from_cents(500)).await.unwrap();
        assert_eq!(account.current_capital_cents, 500);

        engine.store().inject_conflicts(DEFAULT_MAX_ATTEMPTS).unwrap();
        let err = engine.contribute(Money::from_cents(500)).await.unwrap_err();
        assert!(matches!(err, DbError::RetriesExhausted { .. }));
        assert_eq!(engine.cash_account().await.unwrap().current_capital_cents, 500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_contributions_all_land() {
        let engine = LedgerEngine::with_config(
            MemoryStore::new(),
            TENANT,
            EngineConfig {
                max_attempts: 25,
                ..EngineConfig::default()
            },
        );

        let mut handles = Vec::new();
        for _ in 0..20 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.contribute(Money::from_cents(100)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let account = engine.cash_account().await.unwrap();
        assert_eq!(account.current_capital_cents, 2_000);
        assert_eq!(account.initial_capital_cents, 2_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sales_never_oversell() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;

        let a = {
            let engine = engine.clone();
            let request = credit(&client.id, vec![CartLine::new("A", 3)]);
            tokio::spawn(async move { engine.commit_sale(request).await })
        };
        let b = {
            let engine = engine.clone();
            let request = credit(&client.id, vec![CartLine::new("A", 3)]);
            tokio::spawn(async move { engine.commit_sale(request).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(engine.item("A").await.unwrap().quantity_on_hand, 2);
        assert_eq!(engine.receivables().await.unwrap().len(), 1);
        assert!(engine.audit().await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn test_withdraw_profit_needs_profit() {
        let engine = engine();
        engine.set_initial_capital(Money::from_cents(10_000), false).await.unwrap();

        let err = engine
            .withdraw(Money::from_cents(100), WithdrawSource::Profit)
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(CoreError::InsufficientFunds { .. })
        ));

        let account = engine
            .withdraw(Money::from_cents(100), WithdrawSource::Capital)
            .await
            .unwrap();
        assert_eq!(account.current_capital_cents, 9_900);
        assert_eq!(account.initial_capital_cents, 9_900);

        let err = engine
            .set_initial_capital(Money::from_cents(1), false)
            .await
            .unwrap_err();
        assert!(matches!(err.as_core(), Some(CoreError::AlreadyInitialized)));
    }

    #[tokio::test]
    async fn test_payable_payment_draws_from_source() {
        let engine = engine();
        engine.set_initial_capital(Money::from_cents(5_000), false).await.unwrap();
        let payable = engine
            .record_payable(NewPayable {
                provider: "Distribuidora".to_string(),
                concept: "Restock".to_string(),
                amount: Money::from_cents(3_000),
            })
            .await
            .unwrap();

        let outcome = engine
            .apply_payment(PaymentRequest::payable(
                &payable.id,
                Money::from_cents(3_000),
                Some(WithdrawSource::Capital),
            ))
            .await
            .unwrap();
        assert_eq!(outcome.status, SettlementStatus::Settled);

        let account = engine.cash_account().await.unwrap();
        assert_eq!(account.current_capital_cents, 2_000);
        assert_eq!(account.initial_capital_cents, 2_000);
        assert_eq!(engine.payable(&payable.id).await.unwrap().payments.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_keeps_inventory_and_capital() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;
        engine.set_initial_capital(Money::from_cents(1_000), false).await.unwrap();
        engine
            .commit_sale(SaleRequest {
                client_id: Some(client.id.clone()),
                sale_type: SaleType::Cash,
                lines: vec![CartLine::new("B", 1)],
            })
            .await
            .unwrap();
        engine
            .commit_sale(credit(&client.id, vec![CartLine::new("A", 1)]))
            .await
            .unwrap();
        let before = engine.cash_account().await.unwrap();

        let summary = engine.reset_ledger().await.unwrap();
        assert_eq!(summary.sales_deleted, 2);
        assert_eq!(summary.receivables_deleted, 1);

        assert!(engine.sales().await.unwrap().is_empty());
        assert!(engine.receivables().await.unwrap().is_empty());
        assert_eq!(engine.client(&client.id).await.unwrap().current_debt_cents, 0);
        assert_eq!(engine.items().await.unwrap().len(), 2);

        let after = engine.cash_account().await.unwrap();
        assert_eq!(after.initial_capital_cents, before.initial_capital_cents);
        assert_eq!(after.total_profit_cents, before.total_profit_cents);
    }

    #[tokio::test]
    async fn test_summary_totals() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;
        engine
            .commit_sale(credit(&client.id, vec![CartLine::new("A", 1)]))
            .await
            .unwrap();

        let summary = engine.summary().await.unwrap();
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.units_on_hand, 9);
        assert_eq!(summary.open_receivables, 1);
        assert_eq!(summary.receivables_outstanding, Money::from_cents(7_000));
        assert_eq!(summary.client_debt, Money::from_cents(7_000));
    }

    #[tokio::test]
    async fn test_subscription_sees_committed_sale() {
        let engine = engine();
        let client = hundred_dollar_shop(&engine).await;
        let mut sales = engine.subscribe::<Sale>();
        assert!(sales.next().await.unwrap().unwrap().is_empty());

        engine
            .commit_sale(credit(&client.id, vec![CartLine::new("B", 1)]))
            .await
            .unwrap();
        let current = sales.next().await.unwrap().unwrap();
        assert_eq!(current.len(), 1);
    }
}
