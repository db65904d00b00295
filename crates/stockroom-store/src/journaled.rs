use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stockroom_types::{InsertDefaults, StockKey, StockRecord, UpdateFields};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::journal::{Journal, SyncMode};
use crate::memory::{read_table, write_table, LedgerTable};
use crate::query::{paginate, Page, PageRequest, StockFilter};
use crate::traits::LedgerStore;

/// One journaled ledger change: the full post-mutation image of a record,
/// or its removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerChange {
    Put { record: StockRecord },
    Remove { key: StockKey },
}

/// Durable ledger store: an in-memory table rebuilt from a [`Journal`].
///
/// Every mutation plans the new record image under the table's write lock,
/// journals it, then commits it to the table before releasing the lock. A
/// journal failure leaves the table unchanged and surfaces as
/// [`StoreError::Unavailable`].
pub struct JournaledLedgerStore {
    table: RwLock<LedgerTable>,
    journal: Journal<LedgerChange>,
}

impl JournaledLedgerStore {
    /// Open the journal at `path` and replay it.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        let journal = Journal::open(path, sync_mode)?;
        let mut table = LedgerTable::default();
        let changes = journal.recover()?;
        let replayed = changes.len();
        for change in changes {
            match change {
                LedgerChange::Put { record } => table.put(record),
                LedgerChange::Remove { key } => {
                    table.remove(&key);
                }
            }
        }
        info!(path = %path.display(), replayed, records = table.len(), "ledger journal opened");

        Ok(Self {
            table: RwLock::new(table),
            journal,
        })
    }

    /// Rewrite the journal as one `Put` per live record.
    pub fn compact(&self) -> StoreResult<()> {
        let table = write_table(&self.table)?;
        let changes: Vec<LedgerChange> = table
            .rows()
            .cloned()
            .map(|record| LedgerChange::Put { record })
            .collect();
        self.journal.rewrite(&changes).map_err(journal_fault)
    }

    fn record(&self, change: &LedgerChange) -> StoreResult<()> {
        self.journal.append(change).map(|_| ()).map_err(journal_fault)
    }
}

fn journal_fault(err: StoreError) -> StoreError {
    match err {
        StoreError::Io(e) => StoreError::Unavailable(format!("ledger journal: {e}")),
        other => other,
    }
}

#[async_trait]
impl LedgerStore for JournaledLedgerStore {
    async fn upsert_add(
        &self,
        key: &StockKey,
        quantity: u64,
        defaults: InsertDefaults,
        update: UpdateFields,
    ) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_add(key, quantity, defaults, update)?;
        self.record(&LedgerChange::Put { record: next.clone() })?;
        table.put(next.clone());
        Ok(next)
    }

    async fn decrement(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_decrement(key, quantity)?;
        self.record(&LedgerChange::Put { record: next.clone() })?;
        table.put(next.clone());
        Ok(next)
    }

    async fn increment(&self, key: &StockKey, quantity: u64) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        let next = table.plan_increment(key, quantity)?;
        self.record(&LedgerChange::Put { record: next.clone() })?;
        table.put(next.clone());
        Ok(next)
    }

    async fn delete(&self, key: &StockKey) -> StoreResult<StockRecord> {
        let mut table = write_table(&self.table)?;
        if table.get(key).is_none() {
            return Err(StoreError::NotFound(key.clone()));
        }
        self.record(&LedgerChange::Remove { key: key.clone() })?;
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

impl std::fmt::Debug for JournaledLedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledLedgerStore")
            .field("journal", &self.journal.path())
            .finish()
    }
}
