use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::key::StockKey;

/// One row of the stock ledger, unique per [`StockKey`].
///
/// `unit_price`, `category`, `minimum_stock` and the `created_*` fields are
/// written once, when the record is first inserted. Later adds only touch
/// `quantity` and the `updated_*`/`date_of_addition` fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub name: String,
    pub company: String,
    pub unit_price: Decimal,
    pub quantity: u64,
    pub category: Option<String>,
    pub minimum_stock: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub date_of_addition: DateTime<Utc>,
}

impl StockRecord {
    /// Build a fresh record for a key that has never been stocked.
    pub fn insert(
        key: &StockKey,
        quantity: u64,
        defaults: InsertDefaults,
        update: UpdateFields,
    ) -> Self {
        Self {
            name: key.name().to_string(),
            company: key.company().to_string(),
            unit_price: defaults.unit_price,
            quantity,
            category: defaults.category,
            minimum_stock: defaults.minimum_stock,
            created_at: defaults.created_at,
            created_by: defaults.created_by,
            updated_at: update.updated_at,
            updated_by: update.updated_by,
            date_of_addition: update.date_of_addition,
        }
    }

    /// The composite key of this record.
    pub fn key(&self) -> StockKey {
        StockKey::from_normalized(self.name.clone(), self.company.clone())
    }

    /// `quantity * unit_price`, derived at read time and never stored.
    pub fn total_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    /// Whether the quantity sits at or below the configured minimum.
    ///
    /// Records without a minimum (or with a minimum of zero) never report
    /// low stock.
    pub fn is_low_stock(&self) -> bool {
        match self.minimum_stock {
            Some(min) if min > 0 => self.quantity <= min,
            _ => false,
        }
    }

    /// Apply the refresh-on-every-add fields.
    pub fn apply_update(&mut self, update: UpdateFields) {
        self.updated_at = update.updated_at;
        self.updated_by = update.updated_by;
        self.date_of_addition = update.date_of_addition;
    }
}

/// Fields applied only when an add creates the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertDefaults {
    pub unit_price: Decimal,
    pub category: Option<String>,
    pub minimum_stock: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

/// Fields refreshed by every add, whether it inserts or increments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateFields {
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub date_of_addition: DateTime<Utc>,
}
