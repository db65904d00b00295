use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::key::StockKey;

/// Kind of mutation recorded by a [`LogEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    AddInventory,
    Sell,
    Delete,
    Return,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddInventory => "add_inventory",
            Self::Sell => "sell",
            Self::Delete => "delete",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action-specific payload of a log entry.
///
/// Serialized inline with the entry, discriminated by an `action` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LogDetails {
    AddInventory {
        quantity_added: u64,
        unit_price: Decimal,
        total_value: Decimal,
        category: Option<String>,
    },
    Sell {
        quantity_sold: u64,
        buyer: Option<String>,
        price: Option<Decimal>,
        /// Set only for allotments, which log a sale without touching stock.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_alloted: Option<DateTime<Utc>>,
    },
    Delete {
        quantity_deleted: u64,
    },
    Return {
        quantity: u64,
        buyer: Option<String>,
        date_returned: DateTime<Utc>,
    },
}

impl LogDetails {
    pub fn action(&self) -> LogAction {
        match self {
            Self::AddInventory { .. } => LogAction::AddInventory,
            Self::Sell { .. } => LogAction::Sell,
            Self::Delete { .. } => LogAction::Delete,
            Self::Return { .. } => LogAction::Return,
        }
    }

    /// The quantity moved by this event, whatever its direction.
    pub fn quantity(&self) -> u64 {
        match self {
            Self::AddInventory { quantity_added, .. } => *quantity_added,
            Self::Sell { quantity_sold, .. } => *quantity_sold,
            Self::Delete { quantity_deleted } => *quantity_deleted,
            Self::Return { quantity, .. } => *quantity,
        }
    }
}

/// One immutable audit event.
///
/// Entries reference a stock key by value; the referenced record may since
/// have been deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub item_name: String,
    pub company: String,
    #[serde(flatten)]
    pub details: LogDetails,
    pub timestamp: DateTime<Utc>,
    pub performed_by: Option<String>,
}

impl LogEntry {
    /// Create an entry stamped with a fresh time-ordered id.
    pub fn new(
        key: &StockKey,
        details: LogDetails,
        timestamp: DateTime<Utc>,
        performed_by: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            item_name: key.name().to_string(),
            company: key.company().to_string(),
            details,
            timestamp,
            performed_by,
        }
    }

    pub fn action(&self) -> LogAction {
        self.details.action()
    }

    /// Whether this entry refers to the given key.
    pub fn concerns(&self, key: &StockKey) -> bool {
        self.item_name == key.name() && self.company == key.company()
    }
}
