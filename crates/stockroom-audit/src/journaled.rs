use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_store::{Journal, StoreError, SyncMode};
use stockroom_types::LogEntry;
use tracing::info;

use crate::error::{AuditError, AuditResult};
use crate::memory::read_entries;
use crate::projection;
use crate::traits::AuditLog;

/// Durable audit log: entries are journaled before they become visible.
pub struct JournaledAuditLog {
    entries: RwLock<Vec<LogEntry>>,
    journal: Journal<LogEntry>,
}

impl JournaledAuditLog {
    /// Open the journal at `path` and load every intact entry.
    pub fn open(path: &Path, sync_mode: SyncMode) -> AuditResult<Self> {
        let journal = Journal::open(path, sync_mode)?;
        let entries = journal.recover()?;
        info!(path = %path.display(), entries = entries.len(), "audit journal opened");
        Ok(Self {
            entries: RwLock::new(entries),
            journal,
        })
    }
}

#[async_trait]
impl AuditLog for JournaledAuditLog {
    async fn append(&self, entry: LogEntry) -> AuditResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("audit write lock poisoned".into()))?;
        self.journal.append(&entry).map_err(|e| match e {
            StoreError::Io(io) => AuditError::Unavailable(format!("audit journal: {io}")),
            other => AuditError::Journal(other),
        })?;
        entries.push(entry);
        Ok(())
    }

    async fn all(&self) -> AuditResult<Vec<LogEntry>> {
        Ok(read_entries(&self.entries)?.clone())
    }

    async fn recent(&self, limit: usize) -> AuditResult<Vec<LogEntry>> {
        Ok(projection::recent(&read_entries(&self.entries)?, limit))
    }

    async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AuditResult<Vec<LogEntry>> {
        Ok(projection::between(&read_entries(&self.entries)?, start, end))
    }

    async fn count(&self) -> AuditResult<usize> {
        Ok(read_entries(&self.entries)?.len())
    }
}

impl std::fmt::Debug for JournaledAuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournaledAuditLog")
            .field("journal", &self.journal.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::tests::entry;

    #[tokio::test]
    async fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.journal");

        let written = {
            let log = JournaledAuditLog::open(&path, SyncMode::default()).unwrap();
            let first = entry("bolt", 1);
            let second = entry("nut", 2);
            log.append(first.clone()).await.unwrap();
            log.append(second.clone()).await.unwrap();
            vec![first, second]
        };

        let log = JournaledAuditLog::open(&path, SyncMode::default()).unwrap();
        assert_eq!(log.all().await.unwrap(), written);
        assert_eq!(log.recent(1).await.unwrap()[0].item_name, "nut");
    }
}
