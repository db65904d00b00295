use std::sync::{RwLock, RwLockReadGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_types::LogEntry;

use crate::error::{AuditError, AuditResult};
use crate::projection;
use crate::traits::AuditLog;

pub(crate) fn read_entries(lock: &RwLock<Vec<LogEntry>>) -> AuditResult<RwLockReadGuard<'_, Vec<LogEntry>>> {
    lock.read()
        .map_err(|_| AuditError::Unavailable("audit read lock poisoned".into()))
}

/// In-memory audit log for tests, local demos, and embedding.
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: LogEntry) -> AuditResult<()> {
        self.entries
            .write()
            .map_err(|_| AuditError::Unavailable("audit write lock poisoned".into()))?
            .push(entry);
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
