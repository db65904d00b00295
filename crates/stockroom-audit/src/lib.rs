//! Append-only audit log for Stockroom.
//!
//! Every successful stock mutation produces exactly one [`LogEntry`]. Entries
//! are never updated or removed, and they outlive the stock records they
//! reference: deleting an item leaves its history readable.
//!
//! - [`AuditLog`] trait boundary
//! - [`InMemoryAuditLog`] for tests and embedding
//! - [`JournaledAuditLog`] backed by a crash-recoverable journal
//! - [`projection`] helpers shared by both (recent, time window, key history)
//!
//! [`LogEntry`]: stockroom_types::LogEntry

pub mod error;
pub mod journaled;
pub mod memory;
pub mod projection;
pub mod traits;

pub use error::{AuditError, AuditResult};
pub use journaled::JournaledAuditLog;
pub use memory::InMemoryAuditLog;
pub use projection::ActivityCounts;
pub use traits::AuditLog;
