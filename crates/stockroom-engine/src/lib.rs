//! Inventory mutation engine for Stockroom.
//!
//! Every mutating operation runs the same two-step protocol:
//!
//! 1. validate the payload and normalize the key (all business failures
//!    happen here, before any store call);
//! 2. mutate the [`LedgerStore`], then append the matching [`LogEntry`] to
//!    the [`AuditLog`]. The append is the commit point of the operation.
//!
//! Batch forms run the protocol once per item with no cross-item atomicity.
//! Reads go straight to the stores through [`QueryService`].
//!
//! [`LedgerStore`]: stockroom_store::LedgerStore
//! [`AuditLog`]: stockroom_audit::AuditLog
//! [`LogEntry`]: stockroom_types::LogEntry

pub mod batch;
pub mod engine;
pub mod error;
pub mod query;
pub mod request;
pub mod stores;
pub mod validation;

pub use batch::{BatchLine, BatchReport};
pub use engine::{
    AddOutcome, Clock, DeleteOutcome, MutationEngine, ReturnOutcome, SaleOutcome,
};
pub use error::{EngineError, EngineResult, FieldErrors};
pub use query::{
    DailyActivity, Dashboard, InventoryItem, InventoryPage, KeyHistory, ListParams, Pagination,
    QueryService,
};
pub use request::{ItemRef, Movement, NewStock, Sale};
pub use stores::Stores;
