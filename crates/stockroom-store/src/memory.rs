use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use stockroom_types::{InsertDefaults, StockKey, StockRecord, UpdateFields};

use crate::error::{StoreError, StoreResult};
use crate::query::{paginate, Page, PageRequest, StockFilter};
use crate::traits::LedgerStore;

/// The rows of a ledger plus the pure transition rules over them.
///
/// Each `plan_*` method computes the post-mutation image of one record
/// without changing the table. Callers commit it with [`put`](Self::put)
/// once any side effects (journaling) have succeeded.
#[derive(Default)]
pub(crate) struct LedgerTable {
    rows: BTreeMap<StockKey, StockRecord>,
}

impl LedgerTable {
    pub(crate) fn get(&self, key: &StockKey) -> Option<&StockRecord> {
        self.rows.get(key)
    }

    pub(crate) fn rows(&self) -> impl Iterator<Item = &StockRecord> {
        self.rows.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn plan_add(
        &self,
        key: &StockKey,
        quantity: u64,
        defaults: InsertDefaults,
        update: UpdateFields,
    ) -> StoreResult<StockRecord> {
        match self.rows.get(key) {
            Some(existing) => {
                let mut next = existing.clone();
                next.quantity = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| StoreError::QuantityOverflow(key.clone()))?;
                next.apply_update(update);
                Ok(next)
            }
            None => Ok(StockRecord::insert(key, quantity, defaults, update)),
        }
    }

    pub(crate) fn plan_decrement(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let existing = self
            .rows
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        if existing.quantity < quantity {
            return Err(StoreError::InsufficientStock {
                key: key.clone(),
                requested: quantity,
                available: existing.quantity,
            });
        }
        let mut next = existing.clone();
        next.quantity -= quantity;
        Ok(next)
    }

    pub(crate) fn plan_increment(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let existing = self
            .rows
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        let mut next = existing.clone();
        next.quantity = existing
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| StoreError::QuantityOverflow(key.clone()))?;
        Ok(next)
    }

    pub(crate) fn put(&mut self, record: StockRecord) {
        self.rows.insert(record.key(), record);
    }

    pub(crate) fn remove(&mut self, key: &StockKey) -> Option<StockRecord> {
        self.rows.remove(key)
    }
}

pub(crate) fn read_table(lock: &RwLock<LedgerTable>) -> StoreResult<RwLockReadGuard<'_, LedgerTable>> {
    lock.read()
        .map_err(|_| StoreError::Unavailable("ledger read lock poisoned".into()))
}

pub(crate) fn write_table(lock: &RwLock<LedgerTable>) -> StoreResult<RwLockWriteGuard<'_, LedgerTable>> {
    lock.write()
        .map_err(|_| StoreError::Unavailable("ledger write lock poisoned".into()))
}

/// In-memory, `BTreeMap`-based ledger store.
///
/// Intended for tests and embedding. One `RwLock` guards the whole table, so
/// every mutation is trivially linearizable.
pub struct InMemoryLedgerStore {
    table: RwLock<LedgerTable>,
}

impl InMemoryLedgerStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(LedgerTable::default()),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        read_table(&self.table).map(|t| t.len()).unwrap_or(0)
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn upsert_add(
        &self,
        key: &StockKey,
        quantity: u64,
        defaults: InsertDefaults,
        update: UpdateFields,
    ) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_add(key, quantity, defaults, update)?;
        table.put(next.clone());
        Ok(next)
    }

    async fn decrement(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_decrement(key, quantity)?;
        table.put(next.clone());
        Ok(next)
    }

    async fn increment(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_increment(key, quantity)?;
        table.put(next.clone());
        Ok(next)
    }

    async fn delete(&self, key: &StockKey) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        table
            .remove(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn find(&self, key: &StockKey) -> StoreResult<Option<StockRecord>> {
        Ok(read_table(&self.table)?.get(key).cloned())
    }

    async fn query(&self, filter: &StockFilter, page: PageRequest) -> StoreResult<Page<StockRecord>> {
        let table = read_table(&self.table)?;
        Ok(paginate(table.rows(), filter, page))
    }

    async fn scan_all(&self) -> StoreResult<Vec<StockRecord>> {
        Ok(read_table(&self.table)?.rows().cloned().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(read_table(&self.table)?.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedgerStore")
            .field("record_count", &self.len())
            .finish()
    }
}
