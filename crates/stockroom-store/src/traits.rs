use std::collections::BTreeSet;

use async_trait::async_trait;
use stockroom_types::{InsertDefaults, StockKey, StockRecord, UpdateFields};

use crate::error::StoreResult;
use crate::query::{Page, PageRequest, StockFilter};

/// Keyed stock ledger.
///
/// All implementations must satisfy these invariants:
/// - Mutations are linearizable per key. A read-check-write (e.g. the
///   sufficiency check inside [`decrement`](Self::decrement)) is never split
///   into steps another caller can interleave with.
/// - `quantity` never goes below zero.
/// - A failed mutation leaves the record exactly as it was.
/// - Scans reflect current state each time they are issued.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert-if-absent-else-increment.
    ///
    /// A new record takes `defaults` and `quantity`. An existing record keeps
    /// its insert-time fields, gains `quantity`, and takes `update`.
    async fn upsert_add(
        &self,
        key: &StockKey,
        quantity: u64,
        defaults: InsertDefaults,
        update: UpdateFields,
    ) -> StoreResult<StockRecord>;

    /// Subtract `quantity`, failing with `NotFound` or `InsufficientStock`
    /// without side effects.
    async fn decrement(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord>;

    /// Add `quantity` to an existing record. Never creates one.
    async fn increment(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord>;

    /// Remove a record, returning its last state.
    async fn delete(&self, key: &StockKey) -> StoreResult<StockRecord>;

    /// Read a record by key. Returns `Ok(None)` if it does not exist.
    async fn find(&self, key: &StockKey) -> StoreResult<Option<StockRecord>>;

    /// Filtered, offset-paginated read in key order.
    async fn query(&self, filter: &StockFilter, page: PageRequest) -> StoreResult<Page<StockRecord>>;

    /// Every record, in key order.
    async fn scan_all(&self) -> StoreResult<Vec<StockRecord>>;

    /// Number of records.
    ///
    /// Default implementation scans. Backends may override.
    async fn count(&self) -> StoreResult<u64> {
        Ok(self.scan_all().await?.len() as u64)
    }

    /// Distinct normalized item names.
    ///
    /// Default implementation scans. Backends may override.
    async fn distinct_names(&self) -> StoreResult<BTreeSet<String>> {
        Ok(self
            .scan_all()
            .await?
            .into_iter()
            .map(|record| record.name)
            .collect())
    }
}
