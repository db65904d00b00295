//! Deterministic read projections over an entry sequence.

use chrono::{DateTime, Utc};
use stockroom_types::{LogAction, LogEntry, StockKey};

/// The `limit` newest entries, newest first.
///
/// Entries with equal timestamps keep reverse insertion order, so the most
/// recently appended one wins ties.
pub fn recent(entries: &[LogEntry], limit: usize) -> Vec<LogEntry> {
    let mut newest_first: Vec<&LogEntry> = entries.iter().rev().collect();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    newest_first.into_iter().take(limit).cloned().collect()
}

/// Entries whose timestamp lies in `[start, end]`.
pub fn between(entries: &[LogEntry], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<LogEntry> {
    entries
        .iter()
        .filter(|e| e.timestamp >= start && e.timestamp <= end)
        .cloned()
        .collect()
}

/// Entries that reference `key`.
pub fn for_key(entries: &[LogEntry], key: &StockKey) -> Vec<LogEntry> {
    entries.iter().filter(|e| e.concerns(key)).cloned().collect()
}

/// Event counts and moved quantities per action.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ActivityCounts {
    pub added: u64,
    pub sold: u64,
    pub returned: u64,
    pub deleted: u64,
    pub events: usize,
}

impl ActivityCounts {
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a LogEntry>) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            let qty = entry.details.quantity();
            let slot = match entry.action() {
                LogAction::AddInventory => &mut counts.added,
                LogAction::Sell => &mut counts.sold,
                LogAction::Return => &mut counts.returned,
                LogAction::Delete => &mut counts.deleted,
            };
            *slot = slot.saturating_add(qty);
            counts.events += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use stockroom_types::LogDetails;

    use super::*;

    fn entry(name: &str, hour: u32, details: LogDetails) -> LogEntry {
        let key = StockKey::new(name, "acme").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap();
        LogEntry::new(&key, details, at, Some("alice".into()))
    }

    fn sold(qty: u64) -> LogDetails {
        LogDetails::Sell { quantity_sold: qty, buyer: None, price: None, date_alloted: None }
    }

    #[test]
    fn recent_is_newest_first_and_limited() {
        let entries = vec![
            entry("a", 1, sold(1)),
            entry("b", 3, sold(1)),
            entry("c", 2, sold(1)),
            entry("d", 3, sold(1)),
        ];
        let top = recent(&entries, 3);
        let names: Vec<_> = top.iter().map(|e| e.item_name.as_str()).collect();
        assert_eq!(names, ["d", "b", "c"]);
    }

    #[test]
    fn between_is_inclusive() {
        let entries = vec![entry("a", 1, sold(1)), entry("b", 2, sold(1)), entry("c", 3, sold(1))];
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 1, 2, 0, 0).unwrap();
        assert_eq!(between(&entries, start, end).len(), 2);
    }

    #[test]
    fn tally_sums_quantities_per_action() {
        let entries = vec![
            entry("a", 1, LogDetails::Delete { quantity_deleted: 4 }),
            entry("a", 2, sold(2)),
            entry("a", 3, sold(3)),
        ];
        let counts = ActivityCounts::tally(&entries);
        assert_eq!(counts.sold, 5);
        assert_eq!(counts.deleted, 4);
        assert_eq!(counts.added, 0);
        assert_eq!(counts.events, 3);
    }
}
