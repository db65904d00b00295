//! Read side: paginated listing, dashboard totals, day views and history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockroom_audit::{ActivityCounts, AuditLog};
use stockroom_store::{LedgerStore, Page, PageRequest, StockFilter};
use stockroom_types::{Decimal, DayWindow, LogEntry, StockKey, StockRecord};

use crate::error::{EngineError, EngineResult};
use crate::validation::BAD_DATE;

/// Entries shown in the dashboard's recent activity.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Listing parameters as they arrive on a query string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> EngineResult<PageRequest> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(PageRequest::DEFAULT_PER_PAGE);
        if page == 0 || per_page == 0 {
            return Err(EngineError::invalid("page and per_page must be at least 1"));
        }
        Ok(PageRequest::new(page, per_page))
    }

    fn filter(&self) -> StockFilter {
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => StockFilter::name_contains(needle),
            _ => StockFilter::all(),
        }
    }
}

/// A record plus its derived total value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryItem {
    #[serde(flatten)]
    pub record: StockRecord,
    pub total_value: Decimal,
}

impl From<StockRecord> for InventoryItem {
    fn from(record: StockRecord) -> Self {
        let total_value = record.total_value();
        Self { record, total_value }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            pages: page.pages(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InventoryPage {
    pub items: Vec<InventoryItem>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_items: u64,
    pub total_value: Decimal,
    pub recent_activities: Vec<LogEntry>,
}

/// Records stocked on a calendar day and the log entries written that day.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyActivity {
    pub inventory: Vec<StockRecord>,
    pub logs: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyHistory {
    pub name: String,
    pub company: String,
    pub current: Option<StockRecord>,
    pub activity: ActivityCounts,
    pub entries: Vec<LogEntry>,
}

/// Read-only views over the ledger and audit log.
#[derive(Clone)]
pub struct QueryService {
    ledger: Arc<dyn LedgerStore>,
    audit: Arc<dyn AuditLog>,
}

impl QueryService {
    pub fn new(ledger: Arc<dyn LedgerStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self { ledger, audit }
    }

    pub async fn list_inventory(&self, params: &ListParams) -> EngineResult<InventoryPage> {
        let request = params.page_request()?;
        let page = self.ledger.query(&params.filter(), request).await?;
        let pagination = Pagination::from(&page);
        Ok(InventoryPage {
            items: page.items.into_iter().map(InventoryItem::from).collect(),
            pagination,
        })
    }

    pub async fn dashboard(&self) -> EngineResult<Dashboard> {
        let records = self.ledger.scan_all().await?;
        let total_value: Decimal = records.iter().map(StockRecord::total_value).sum();
        Ok(Dashboard {
            total_items: records.len() as u64,
            total_value,
            recent_activities: self.audit.recent(RECENT_ACTIVITY_LIMIT).await?,
        })
    }

    /// Everything dated `date` (`YYYY-MM-DD`, UTC day).
    pub async fn by_date(&self, date: &str) -> EngineResult<DailyActivity> {
        let date = date.trim();
        if date.is_empty() {
            return Err(EngineError::invalid("Date parameter is required"));
        }
        let window = DayWindow::parse(date).map_err(|_| EngineError::invalid(BAD_DATE))?;

        let inventory = self
            .ledger
            .scan_all()
            .await?
            .into_iter()
            .filter(|r| window.contains(&r.date_of_addition))
            .collect();
        let logs = self.audit.between(window.start, window.end).await?;
        Ok(DailyActivity { inventory, logs })
    }

    pub async fn distinct_names(&self) -> EngineResult<Vec<String>> {
        Ok(self.ledger.distinct_names().await?.into_iter().collect())
    }

    pub async fn all_logs(&self) -> EngineResult<Vec<LogEntry>> {
        Ok(self.audit.all().await?)
    }

    /// Current record (if any) and full history of one key, including
    /// entries written before a delete.
    pub async fn history(&self, name: &str, company: &str) -> EngineResult<KeyHistory> {
        let key = StockKey::new(name, company)?;
        let current = self.ledger.find(&key).await?;
        let entries = self.audit.for_key(&key).await?;
        Ok(KeyHistory {
            name: key.name().to_string(),
            company: key.company().to_string(),
            current,
            activity: ActivityCounts::tally(&entries),
            entries,
        })
    }
}

impl std::fmt::Debug for QueryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockroom_audit::InMemoryAuditLog;
    use stockroom_store::InMemoryLedgerStore;
    use stockroom_types::{Actor, LogAction};

    use super::*;
    use crate::engine::tests::{fixed_clock, stock};
    use crate::engine::MutationEngine;
    use crate::request::{ItemRef, NewStock, Sale};

    fn setup() -> (MutationEngine, QueryService) {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        (
            MutationEngine::with_clock(ledger.clone(), audit.clone(), fixed_clock()),
            QueryService::new(ledger, audit),
        )
    }

    #[tokio::test]
    async fn pagination_splits_twenty_five_records() {
        let (engine, queries) = setup();
        let alice = Actor::user("alice");
        for i in 0..25 {
            engine.add(&alice, &stock(&format!("item-{i:02}"), "acme", 1)).await.unwrap();
        }

        let params = ListParams { page: Some(3), per_page: Some(10), search: None };
        let page = queries.list_inventory(&params).await.unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(
            page.pagination,
            Pagination { page: 3, per_page: 10, total: 25, pages: 3 }
        );

        let first = queries.list_inventory(&ListParams::default()).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.pagination.page, 1);
    }

    #[tokio::test]
    async fn list_rejects_page_zero_and_filters_by_name() {
        let (engine, queries) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("blue widget", "acme", 1)).await.unwrap();
        engine.add(&alice, &stock("bolt", "acme", 1)).await.unwrap();

        let zero = ListParams { page: Some(0), ..Default::default() };
        assert!(matches!(
            queries.list_inventory(&zero).await,
            Err(EngineError::Validation { .. })
        ));

        let search = ListParams { search: Some("WIDGET".into()), ..Default::default() };
        let page = queries.list_inventory(&search).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].record.name, "blue widget");
    }

    #[tokio::test]
    async fn inventory_item_serializes_flat_with_total() {
        let (engine, queries) = setup();
        engine.add(&Actor::user("alice"), &stock("widget", "acme", 4)).await.unwrap();

        let page = queries.list_inventory(&ListParams::default()).await.unwrap();
        let json = serde_json::to_value(&page.items[0]).unwrap();
        assert_eq!(json["name"], "widget");
        assert_eq!(json["quantity"], 4);
        assert_eq!(json["total_value"], 10.0);
    }

    #[tokio::test]
    async fn dashboard_totals_and_recent_activity() {
        let (engine, queries) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("widget", "acme", 4)).await.unwrap();
        engine
            .add(&alice, &NewStock::new("bolt", "acme", Decimal::new(50, 2), 10, "2024-06-01"))
            .await
            .unwrap();
        for _ in 0..10 {
            engine.sell(&alice, &Sale::new("bolt", "acme", 1)).await.unwrap();
        }

        let dashboard = queries.dashboard().await.unwrap();
        assert_eq!(dashboard.total_items, 2);
        assert_eq!(dashboard.total_value, Decimal::new(1000, 2));
        assert_eq!(dashboard.recent_activities.len(), RECENT_ACTIVITY_LIMIT);
        assert_eq!(dashboard.recent_activities[0].action(), LogAction::Sell);
    }

    #[tokio::test]
    async fn by_date_matches_calendar_day() {
        let (engine, queries) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("widget", "acme", 1)).await.unwrap();
        engine
            .add(&alice, &NewStock::new("bolt", "acme", Decimal::ONE, 1, "2024-06-02"))
            .await
            .unwrap();

        let day = queries.by_date("2024-06-01").await.unwrap();
        assert_eq!(day.inventory.len(), 1);
        assert_eq!(day.inventory[0].name, "widget");
        // The fixed clock stamps every entry at noon on 2024-06-01.
        assert_eq!(day.logs.len(), 2);

        assert!(queries.by_date("2024-06-03").await.unwrap().inventory.is_empty());
        assert_eq!(
            queries.by_date("June 1st").await.unwrap_err().to_string(),
            BAD_DATE
        );
        assert!(queries.by_date("").await.is_err());
    }

    #[tokio::test]
    async fn history_outlives_delete() {
        let (engine, queries) = setup();
        let admin = Actor::admin("root");
        engine.add(&admin, &stock("widget", "acme", 5)).await.unwrap();
        engine.sell(&admin, &Sale::new("widget", "acme", 2)).await.unwrap();
        engine.delete(&admin, &ItemRef::new("widget", "acme")).await.unwrap();

        let history = queries.history("Widget", "ACME").await.unwrap();
        assert!(history.current.is_none());
        assert_eq!(history.entries.len(), 3);
        assert_eq!(history.activity.added, 5);
        assert_eq!(history.activity.sold, 2);
        assert_eq!(history.activity.deleted, 3);
    }

    #[tokio::test]
    async fn distinct_names_are_sorted_and_unique() {
        let (engine, queries) = setup();
        let alice = Actor::user("alice");
        engine.add(&alice, &stock("nut", "acme", 1)).await.unwrap();
        engine.add(&alice, &stock("bolt", "acme", 1)).await.unwrap();
        engine.add(&alice, &stock("bolt", "globex", 1)).await.unwrap();

        assert_eq!(queries.distinct_names().await.unwrap(), vec!["bolt", "nut"]);
    }
}
