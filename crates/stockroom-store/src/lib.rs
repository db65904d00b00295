//! Keyed stock ledger storage for Stockroom.
//!
//! The ledger store owns every [`StockRecord`](stockroom_types::StockRecord)
//! and is the only writer of `quantity`. It is the serialization point for
//! concurrent requests: callers hold no locks of their own.
//!
//! # Storage Backends
//!
//! All backends implement the [`LedgerStore`] trait:
//!
//! - [`InMemoryLedgerStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`JournaledLedgerStore`] -- in-memory table rebuilt from an on-disk [`Journal`]
//!
//! # Design Rules
//!
//! 1. Every mutation is atomic per key: the existence check, the sufficiency
//!    check and the write happen under one write lock.
//! 2. Business failures (`NotFound`, `InsufficientStock`) leave state untouched.
//! 3. Journaled writes hit the journal before the in-memory table changes.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod journal;
pub mod journaled;
pub mod memory;
pub mod query;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use journal::{Journal, SyncMode};
pub use journaled::JournaledLedgerStore;
pub use memory::InMemoryLedgerStore;
pub use query::{Page, PageRequest, StockFilter};
pub use traits::LedgerStore;
