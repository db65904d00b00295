use std::fs;
use std::path::Path;
use std::sync::Arc;

use stockroom_audit::{AuditLog, InMemoryAuditLog, JournaledAuditLog};
use stockroom_store::{InMemoryLedgerStore, JournaledLedgerStore, LedgerStore, SyncMode};
use tracing::info;

use crate::engine::MutationEngine;
use crate::error::{EngineError, EngineResult};
use crate::query::QueryService;

pub const LEDGER_JOURNAL: &str = "ledger.journal";
pub const AUDIT_JOURNAL: &str = "audit.journal";

/// The pair of stores every engine and query service share.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn LedgerStore>,
    pub audit: Arc<dyn AuditLog>,
}

impl Stores {
    /// Volatile stores; everything is lost on drop.
    pub fn in_memory() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedgerStore::new()),
            audit: Arc::new(InMemoryAuditLog::new()),
        }
    }

    /// Journaled stores under `data_dir`, created if missing.
    pub fn open(data_dir: &Path, sync_mode: SyncMode) -> EngineResult<Self> {
        fs::create_dir_all(data_dir).map_err(|e| {
            EngineError::StoreUnavailable(format!("create {}: {e}", data_dir.display()))
        })?;
        let ledger = JournaledLedgerStore::open(&data_dir.join(LEDGER_JOURNAL), sync_mode)?;
        let audit = JournaledAuditLog::open(&data_dir.join(AUDIT_JOURNAL), sync_mode)?;
        info!(dir = %data_dir.display(), "journaled stores opened");
        Ok(Self {
            ledger: Arc::new(ledger),
            audit: Arc::new(audit),
        })
    }

    pub fn engine(&self) -> MutationEngine {
        MutationEngine::new(self.ledger.clone(), self.audit.clone())
    }

    pub fn queries(&self) -> QueryService {
        QueryService::new(self.ledger.clone(), self.audit.clone())
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use stockroom_types::Actor;

    use super::*;
    use crate::engine::tests::stock;
    use crate::request::Sale;

    #[tokio::test]
    async fn journaled_stores_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let alice = Actor::user("alice");

        {
            let stores = Stores::open(&data_dir, SyncMode::EveryWrite).unwrap();
            let engine = stores.engine();
            engine.add(&alice, &stock("widget", "acme", 5)).await.unwrap();
            engine.sell(&alice, &Sale::new("widget", "acme", 2)).await.unwrap();
        }

        let stores = Stores::open(&data_dir, SyncMode::EveryWrite).unwrap();
        let history = stores.queries().history("widget", "acme").await.unwrap();
        assert_eq!(history.current.map(|r| r.quantity), Some(3));
        assert_eq!(history.entries.len(), 2);
    }
}
