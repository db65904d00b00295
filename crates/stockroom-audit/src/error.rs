/// Errors produced by audit log operations.
///
/// There are no business failures here: an append is only ever refused
/// when the backend cannot take it.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit log unavailable: {0}")]
    Unavailable(String),

    #[error("audit journal error: {0}")]
    Journal(#[from] stockroom_store::StoreError),
}

pub type AuditResult<T> = Result<T, AuditError>;
