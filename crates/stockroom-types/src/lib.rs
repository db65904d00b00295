//! Foundation types for Stockroom.
//!
//! Every other Stockroom crate depends on `stockroom-types`. It owns the
//! identity rules of the catalog and the shapes of the two persisted
//! document kinds.
//!
//! # Key Types
//!
//! - [`StockKey`]: Composite `(name, company)` identity, normalized on construction
//! - [`StockRecord`]: One row of the stock ledger
//! - [`LogEntry`]: One immutable audit event
//! - [`Actor`]: Acting identity and role supplied by the auth layer
//! - [`DayWindow`]: Inclusive calendar-day time window

pub mod entry;
pub mod error;
pub mod identity;
pub mod key;
pub mod record;
pub mod temporal;

pub use entry::{LogAction, LogDetails, LogEntry};
pub use error::TypeError;
pub use identity::{Actor, Role};
pub use key::StockKey;
pub use record::{InsertDefaults, StockRecord, UpdateFields};
pub use temporal::{parse_iso_date, start_of_day, DayWindow};

/// Monetary amounts (unit prices, sale prices, valuations).
pub use rust_decimal::Decimal;
