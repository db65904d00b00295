use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stockroom_types::{LogEntry, StockKey};

use crate::error::AuditResult;
use crate::projection;

/// Append-only mutation history.
///
/// Implementations keep entries in insertion order and never expose a way
/// to alter or drop one.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one entry. Fails only when the backend is unreachable.
    async fn append(&self, entry: LogEntry) -> AuditResult<()>;

    /// Every entry, in insertion order.
    async fn all(&self) -> AuditResult<Vec<LogEntry>>;

    /// The `limit` most recent entries, newest first.
    ///
    /// Default implementation reads everything. Backends may override.
    async fn recent(&self, limit: usize) -> AuditResult<Vec<LogEntry>> {
        Ok(projection::recent(&self.all().await?, limit))
    }

    /// Entries with `start <= timestamp <= end`, in insertion order.
    async fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AuditResult<Vec<LogEntry>> {
        Ok(projection::between(&self.all().await?, start, end))
    }

    /// Every entry that references `key`, including ones written before the
    /// record was deleted.
    async fn for_key(&self, key: &StockKey) -> AuditResult<Vec<LogEntry>> {
        Ok(projection::for_key(&self.all().await?, key))
    }

    /// Number of entries.
    async fn count(&self) -> AuditResult<usize> {
        Ok(self.all().await?.len())
    }
}
