use stockroom_types::StockKey;

/// Errors from ledger store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the key.
    #[error("stock record not found: {0}")]
    NotFound(StockKey),

    /// A decrement asked for more than the record holds.
    #[error("insufficient stock for {key}: requested {requested}, available {available}")]
    InsufficientStock {
        key: StockKey,
        requested: u64,
        available: u64,
    },

    /// An increment would overflow the quantity counter.
    #[error("quantity overflow for {0}")]
    QuantityOverflow(StockKey),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests (poisoned lock, closed journal).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
