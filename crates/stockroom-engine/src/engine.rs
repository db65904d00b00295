use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockroom_audit::AuditLog;
use stockroom_store::LedgerStore;
use stockroom_types::{Actor, Decimal, InsertDefaults, LogDetails, LogEntry, StockRecord, UpdateFields};
use tracing::{error, info, warn};

use crate::batch::BatchReport;
use crate::error::{EngineError, EngineResult};
use crate::request::{ItemRef, Movement, NewStock, Sale};
use crate::validation;

/// Source of timestamps for records and log entries.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Result of an add.
#[derive(Clone, Debug, Serialize)]
pub struct AddOutcome {
    pub record: StockRecord,
    pub entry: LogEntry,
    /// The record is at or below its minimum stock after the add.
    pub low_stock: bool,
}

impl AddOutcome {
    pub fn message(&self) -> String {
        format!(
            "Item '{}' from {} added/updated successfully",
            self.record.name, self.record.company
        )
    }
}

/// Result of a sale.
#[derive(Clone, Debug, Serialize)]
pub struct SaleOutcome {
    pub record: StockRecord,
    pub entry: LogEntry,
}

impl SaleOutcome {
    pub fn message(&self) -> String {
        let sold = self.entry.details.quantity();
        match &self.entry.details {
            LogDetails::Sell { buyer: Some(buyer), .. } => format!(
                "Sold {sold} of {} from {} to {buyer}",
                self.record.name, self.record.company
            ),
            _ => format!("Sold {sold} of {} from {}", self.record.name, self.record.company),
        }
    }
}

/// Result of a delete. `removed` is the record as it was just before removal.
#[derive(Clone, Debug, Serialize)]
pub struct DeleteOutcome {
    pub removed: StockRecord,
    pub entry: LogEntry,
}

impl DeleteOutcome {
    pub fn message(&self) -> String {
        format!(
            "Item '{}' from {} deleted successfully",
            self.removed.name, self.removed.company
        )
    }
}

/// Result of a return.
#[derive(Clone, Debug, Serialize)]
pub struct ReturnOutcome {
    pub record: StockRecord,
    pub entry: LogEntry,
}

impl ReturnOutcome {
    pub fn message(&self) -> String {
        format!(
            "Return logged and inventory updated by adding {} unit(s).",
            self.entry.details.quantity()
        )
    }
}

/// Applies validated mutations to the ledger and records each one in the
/// audit log.
#[derive(Clone)]
pub struct MutationEngine {
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditLog>,
    clock: Clock,
}

impl MutationEngine {
    pub fn new(ledger: Arc<dyn LedgerStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self::with_clock(ledger, audit, Arc::new(Utc::now))
    }

    pub fn with_clock(ledger: Arc<dyn LedgerStore>, audit: Arc<dyn AuditLog>, clock: Clock) -> Self {
        Self { ledger, audit, clock }
    }

    /// Create the record on first sight of its key, otherwise add to its
    /// quantity. Price, category and minimum stock are fixed at creation.
    pub async fn add(&self, actor: &Actor, item: &NewStock) -> EngineResult<AddOutcome> {
        let stock = validation::new_stock(item)?;
        let now = (self.clock)();

        let record = self
            .ledger
            .upsert_add(
                &stock.key,
                stock.quantity,
                InsertDefaults {
                    unit_price: stock.unit_price,
                    category: stock.category.clone(),
                    minimum_stock: stock.minimum_stock,
                    created_at: now,
                    created_by: actor.identity.clone(),
                },
                UpdateFields {
                    updated_at: now,
                    updated_by: actor.identity.clone(),
                    date_of_addition: stock.date_of_addition,
                },
            )
            .await?;

        let entry = LogEntry::new(
            &stock.key,
            LogDetails::AddInventory {
                quantity_added: stock.quantity,
                unit_price: stock.unit_price,
                total_value: Decimal::from(stock.quantity) * stock.unit_price,
                category: stock.category,
            },
            now,
            Some(actor.identity.clone()),
        );
        self.commit(&entry).await?;

        let low_stock = record.is_low_stock();
        if low_stock {
            warn!(
                target: "stockroom::low_stock",
                name = %record.name,
                company = %record.company,
                quantity = record.quantity,
                minimum_stock = ?record.minimum_stock,
                "stock at or below minimum"
            );
        }
        info!(key = %stock.key, added = stock.quantity, quantity = record.quantity, by = %actor.identity, "stock added");

        Ok(AddOutcome { record, entry, low_stock })
    }

    /// Decrement stock. Fails without changing anything when the key is
    /// absent or holds less than the requested quantity.
    pub async fn sell(&self, actor: &Actor, sale: &Sale) -> EngineResult<SaleOutcome> {
        let sale = validation::sale(sale)?;
        let record = self.ledger.decrement(&sale.key, sale.quantity).await?;

        let entry = LogEntry::new(
            &sale.key,
            LogDetails::Sell {
                quantity_sold: sale.quantity,
                buyer: sale.buyer,
                price: sale.price,
                date_alloted: None,
            },
            (self.clock)(),
            Some(actor.identity.clone()),
        );
        self.commit(&entry).await?;

        info!(key = %sale.key, sold = sale.quantity, remaining = record.quantity, by = %actor.identity, "stock sold");
        Ok(SaleOutcome { record, entry })
    }

    /// Remove a record. Its history stays in the audit log.
    pub async fn delete(&self, actor: &Actor, item: &ItemRef) -> EngineResult<DeleteOutcome> {
        let key = validation::item_ref(item)?;
        let removed = self.ledger.delete(&key).await?;

        let entry = LogEntry::new(
            &key,
            LogDetails::Delete {
                quantity_deleted: removed.quantity,
            },
            (self.clock)(),
            Some(actor.identity.clone()),
        );
        self.commit(&entry).await?;

        info!(key = %key, quantity = removed.quantity, by = %actor.identity, "item deleted");
        Ok(DeleteOutcome { removed, entry })
    }

    /// Put returned units back on an existing record. Never creates one.
    pub async fn return_stock(&self, actor: Option<&Actor>, movement: &Movement) -> EngineResult<ReturnOutcome> {
        let movement = validation::movement(movement)?;
        let record = self.ledger.increment(&movement.key, movement.quantity).await?;
        let now = (self.clock)();

        let entry = LogEntry::new(
            &movement.key,
            LogDetails::Return {
                quantity: movement.quantity,
                buyer: movement.buyer,
                date_returned: now,
            },
            now,
            actor.map(|a| a.identity.clone()),
        );
        self.commit(&entry).await?;

        info!(key = %movement.key, returned = movement.quantity, quantity = record.quantity, "stock returned");
        Ok(ReturnOutcome { record, entry })
    }

    /// Log an allotment as a sale without touching stock.
    pub async fn allot(&self, actor: Option<&Actor>, movement: &Movement) -> EngineResult<LogEntry> {
        let movement = validation::movement(movement)?;
        let now = (self.clock)();

        let entry = LogEntry::new(
            &movement.key,
            LogDetails::Sell {
                quantity_sold: movement.quantity,
                buyer: movement.buyer,
                price: None,
                date_alloted: Some(now),
            },
            now,
            actor.map(|a| a.identity.clone()),
        );
        self.commit(&entry).await?;

        info!(key = %movement.key, quantity = movement.quantity, "allotment logged");
        Ok(entry)
    }

    /// Add each item independently. Invalid or failing items are skipped and
    /// reported; the rest are applied.
    pub async fn add_multiple(&self, actor: &Actor, items: &[NewStock]) -> EngineResult<BatchReport> {
        let mut report = BatchReport::default();
        for (index, item) in items.iter().enumerate() {
            match self.add(actor, item).await {
                Ok(outcome) => report.applied(index, outcome.message()),
                Err(err) if err.is_fault() => return Err(err),
                Err(err) => report.failed(index, format!("Item {}: {}", index + 1, batch_failure(&err))),
            }
        }
        Ok(report)
    }

    /// Sell each entry independently. A missing key or short stock fails
    /// only that entry.
    pub async fn sell_multiple(&self, actor: &Actor, sales: &[Sale]) -> EngineResult<BatchReport> {
        let mut report = BatchReport::default();
        for (index, sale) in sales.iter().enumerate() {
            match self.sell(actor, sale).await {
                Ok(outcome) => report.applied(index, outcome.message()),
                Err(EngineError::NotFound(key)) => report.failed(
                    index,
                    format!("Item {} from {} not found.", key.name(), key.company()),
                ),
                Err(EngineError::InsufficientStock { key, .. }) => report.failed(
                    index,
                    format!("Insufficient stock for {} from {}.", key.name(), key.company()),
                ),
                Err(err) if err.is_fault() => return Err(err),
                Err(err) => report.failed(index, format!("Sale {}: {err}", index + 1)),
            }
        }
        Ok(report)
    }

    /// The audit append is the commit point. If it fails after the ledger
    /// already changed, the ledger is left as is and the caller sees a fault.
    async fn commit(&self, entry: &LogEntry) -> EngineResult<()> {
        self.audit.append(entry.clone()).await.map_err(|err| {
            error!(
                id = %entry.id,
                action = entry.action().as_str(),
                item = %entry.item_name,
                company = %entry.company,
                error = %err,
                "ledger changed but audit append failed"
            );
            EngineError::from(err)
        })
    }
}

impl std::fmt::Debug for MutationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationEngine").finish_non_exhaustive()
    }
}

/// `message (field: reason; reason, field: reason)` for validation
/// failures, the error text otherwise.
fn batch_failure(err: &EngineError) -> String {
    match err {
        EngineError::Validation { message, fields } if !fields.is_empty() => {
            let detail = fields
                .iter()
                .map(|(field, reasons)| format!("{field}: {}", reasons.join("; ")))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{message} ({detail})")
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use stockroom_audit::{AuditError, AuditResult, InMemoryAuditLog};
    use stockroom_store::InMemoryLedgerStore;
    use stockroom_types::{LogAction, StockKey};

    use super::*;

    pub(crate) fn fixed_clock() -> Clock {
        Arc::new(|| Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    pub(crate) fn setup() -> (MutationEngine, Arc<InMemoryLedgerStore>, Arc<InMemoryAuditLog>) {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = MutationEngine::with_clock(ledger.clone(), audit.clone(), fixed_clock());
        (engine, ledger, audit)
    }

    pub(crate) fn stock(name: &str, company: &str, qty: i64) -> NewStock {
        NewStock::new(name, company, Decimal::new(250, 2), qty, "2024-06-01")
    }

    fn key(name: &str, company: &str) -> StockKey {
        StockKey::new(name, company).unwrap()
    }

    #[tokio::test]
    async fn add_normalizes_key_and_logs() {
        let (engine, ledger, audit) = setup();
        let alice = Actor::user("alice");

        let outcome = engine.add(&alice, &stock("Widget ", " ACME", 5)).await.unwrap();
        assert_eq!(outcome.message(), "Item 'widget' from acme added/updated successfully");

        let found = ledger.find(&key("widget", "acme")).await.unwrap().unwrap();
        assert_eq!(found.quantity, 5);
        assert_eq!(found.created_by, "alice");

        let logs = audit.all().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action(), LogAction::AddInventory);
        assert_eq!(logs[0].item_name, "widget");
        assert_eq!(logs[0].company, "acme");
        assert_eq!(logs[0].performed_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn upsert_sums_quantities_and_keeps_first_price() {
        let (engine, ledger, _) = setup();
        let alice = Actor::user("alice");
        let bob = Actor::user("bob");

        engine.add(&alice, &stock("widget", "acme", 5)).await.unwrap();
        let second = NewStock::new("WIDGET", "acme", Decimal::new(999, 2), 3, "2024-06-03");
        engine.add(&bob, &second).await.unwrap();

        let record = ledger.find(&key("widget", "acme")).await.unwrap().unwrap();
        assert_eq!(record.quantity, 8);
        assert_eq!(record.unit_price, Decimal::new(250, 2));
        assert_eq!(record.created_by, "alice");
        assert_eq!(record.updated_by, "bob");
        assert_eq!(record.date_of_addition.to_rfc3339(), "2024-06-03T00:00:00+00:00");
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn add_flags_low_stock() {
        let (engine, _, _) = setup();
        let item = stock("widget", "acme", 2).with_minimum_stock(3);
        let outcome = engine.add(&Actor::user("alice"), &item).await.unwrap();
        assert!(outcome.low_stock);

        let plenty = stock("bolt", "acme", 10).with_minimum_stock(3);
        assert!(!engine.add(&Actor::user("alice"), &plenty).await.unwrap().low_stock);
    }

    #[tokio::test]
    async fn invalid_add_touches_nothing() {
        let (engine, ledger, audit) = setup();
        let err = engine
            .add(&Actor::user("alice"), &stock("widget", "acme", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation { .. }));
        assert!(ledger.is_empty());
        assert_eq!(audit.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sell_decrements_and_logs() {
        let (engine, ledger, audit) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("widget", "acme", 5)).await.unwrap();

        let sale = Sale::new("Widget", "ACME", 3).to_buyer("bob", Some(Decimal::new(300, 2)));
        let outcome = engine.sell(&alice, &sale).await.unwrap();
        assert_eq!(outcome.message(), "Sold 3 of widget from acme to bob");
        assert_eq!(ledger.find(&key("widget", "acme")).await.unwrap().unwrap().quantity, 2);

        let logs = audit.all().await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(matches!(
            logs[1].details,
            LogDetails::Sell { quantity_sold: 3, ref buyer, date_alloted: None, .. } if buyer.as_deref() == Some("bob")
        ));
    }

    #[tokio::test]
    async fn oversell_is_rejected_without_side_effects() {
        let (engine, ledger, audit) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("widget", "acme", 2)).await.unwrap();

        let err = engine.sell(&alice, &Sale::new("widget", "acme", 3)).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientStock { requested: 3, available: 2, .. }
        ));
        assert_eq!(ledger.find(&key("widget", "acme")).await.unwrap().unwrap().quantity, 2);
        assert_eq!(audit.count().await.unwrap(), 1);

        let err = engine.sell(&alice, &Sale::new("gadget", "acme", 1)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sales_never_oversell() {
        let (engine, ledger, audit) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("widget", "acme", 5)).await.unwrap();

        let start = Arc::new(tokio::sync::Barrier::new(4));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let engine = engine.clone();
            let alice = alice.clone();
            let start = start.clone();
            handles.push(tokio::spawn(async move {
                start.wait().await;
                engine.sell(&alice, &Sale::new("widget", "acme", 3)).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert!(
                    matches!(err, EngineError::InsufficientStock { requested: 3, available: 2, .. }),
                    "unexpected {err:?}"
                ),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(ledger.find(&key("widget", "acme")).await.unwrap().unwrap().quantity, 2);
        let sells = audit
            .all()
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action() == LogAction::Sell)
            .count();
        assert_eq!(sells, 1);
    }

    #[tokio::test]
    async fn delete_keeps_history() {
        let (engine, ledger, audit) = setup();
        let admin = Actor::admin("root");
        engine.add(&admin, &stock("widget", "acme", 7)).await.unwrap();

        let outcome = engine.delete(&admin, &ItemRef::new("WIDGET", "acme")).await.unwrap();
        assert_eq!(outcome.message(), "Item 'widget' from acme deleted successfully");
        assert!(ledger.find(&key("widget", "acme")).await.unwrap().is_none());

        let history = audit.for_key(&key("widget", "acme")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(matches!(history[1].details, LogDetails::Delete { quantity_deleted: 7 }));

        let err = engine.delete(&admin, &ItemRef::new("widget", "acme")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn return_requires_existing_record() {
        let (engine, ledger, audit) = setup();
        let err = engine
            .return_stock(None, &Movement::new("widget", "acme", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(ledger.is_empty());
        assert_eq!(audit.count().await.unwrap(), 0);

        engine.add(&Actor::user("alice"), &stock("widget", "acme", 1)).await.unwrap();
        let outcome = engine
            .return_stock(None, &Movement::new("Widget", "acme", 2).by("bob"))
            .await
            .unwrap();
        assert_eq!(outcome.record.quantity, 3);
        assert_eq!(outcome.message(), "Return logged and inventory updated by adding 2 unit(s).");
        assert_eq!(outcome.entry.performed_by, None);
    }

    #[tokio::test]
    async fn allot_logs_without_touching_stock() {
        let (engine, ledger, audit) = setup();
        engine.add(&Actor::user("alice"), &stock("widget", "acme", 4)).await.unwrap();

        let entry = engine
            .allot(None, &Movement::new("widget", "acme", 3).by("carol"))
            .await
            .unwrap();
        assert!(matches!(entry.details, LogDetails::Sell { date_alloted: Some(_), .. }));
        assert_eq!(ledger.find(&key("widget", "acme")).await.unwrap().unwrap().quantity, 4);
        assert_eq!(audit.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn sell_multiple_reports_partial_failure() {
        let (engine, ledger, audit) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("a", "acme", 5)).await.unwrap();
        engine.add(&alice, &stock("c", "acme", 5)).await.unwrap();

        let report = engine
            .sell_multiple(
                &alice,
                &[
                    Sale::new("a", "acme", 1),
                    Sale::new("b", "acme", 1),
                    Sale::new("c", "acme", 2),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.lines[1].message, "Item b from acme not found.");
        assert_eq!(ledger.find(&key("a", "acme")).await.unwrap().unwrap().quantity, 4);
        assert_eq!(ledger.find(&key("c", "acme")).await.unwrap().unwrap().quantity, 3);
        assert_eq!(audit.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn add_multiple_skips_invalid_items() {
        let (engine, ledger, _) = setup();
        let report = engine
            .add_multiple(
                &Actor::user("alice"),
                &[stock("a", "acme", 1), stock("b", "acme", -1), stock("a", "ACME", 2)],
            )
            .await
            .unwrap();
        assert_eq!(report.applied_count(), 2);
        assert!(!report.lines[1].applied);
        assert_eq!(
            report.lines[1].message,
            "Item 2: Validation error (quantity: Must be greater than or equal to 1.)"
        );
        assert_eq!(ledger.find(&key("a", "acme")).await.unwrap().unwrap().quantity, 3);
    }

    struct BrokenAudit;

    #[async_trait::async_trait]
    impl AuditLog for BrokenAudit {
        async fn append(&self, _entry: LogEntry) -> AuditResult<()> {
            Err(AuditError::Unavailable("disk full".into()))
        }

        async fn all(&self) -> AuditResult<Vec<LogEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn audit_failure_surfaces_as_store_unavailable() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let engine = MutationEngine::with_clock(ledger, Arc::new(BrokenAudit), fixed_clock());
        let err = engine
            .add(&Actor::user("alice"), &stock("widget", "acme", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));

        let report = engine
            .sell_multiple(&Actor::user("alice"), &[Sale::new("widget", "acme", 1)])
            .await;
        assert!(report.is_err());
    }
}
