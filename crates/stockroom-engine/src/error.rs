use std::collections::BTreeMap;

use stockroom_audit::AuditError;
use stockroom_store::StoreError;
use stockroom_types::{StockKey, TypeError};

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors returned by engine operations.
///
/// `Validation`, `NotFound` and `InsufficientStock` are expected outcomes
/// detected before any store mutation. `StoreUnavailable` and `Internal`
/// are faults.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("item not found: {0}")]
    NotFound(StockKey),

    #[error("insufficient stock for {key}: requested {requested}, available {available}")]
    InsufficientStock {
        key: StockKey,
        requested: u64,
        available: u64,
    },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// A validation failure with no per-field detail.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    /// Whether this is a fault of the backing stores rather than a
    /// rejected request.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Internal(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            StoreError::InsufficientStock { key, requested, available } => {
                Self::InsufficientStock { key, requested, available }
            }
            StoreError::QuantityOverflow(key) => {
                Self::invalid(format!("quantity for {key} would overflow"))
            }
            StoreError::Serialization(msg) => Self::Internal(msg),
            StoreError::Io(e) => Self::StoreUnavailable(e.to_string()),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

impl From<AuditError> for EngineError {
    fn from(err: AuditError) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<TypeError> for EngineError {
    fn from(err: TypeError) -> Self {
        Self::invalid(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
