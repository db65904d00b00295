use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use stockroom_engine::{EngineError, FieldErrors};
use thiserror::Error;
use tracing::error;

use crate::envelope::Reply;

/// Message sent to clients for every 500 outside debug mode.
pub const GENERIC_FAILURE: &str = "An internal error occurred";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::InsufficientStock(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation { message, fields } => Self::Validation { message, fields },
            EngineError::NotFound(_) => Self::NotFound("Item not found".into()),
            EngineError::InsufficientStock { .. } => Self::InsufficientStock("Insufficient stock".into()),
            EngineError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            EngineError::Internal(msg) => Self::Internal(msg),
        }
    }
}

/// Full text of a 500, attached to the response so that a debug-mode
/// layer can expose it.
#[derive(Clone, Debug)]
pub struct FailureDetail(pub String);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            let detail = self.to_string();
            error!(status = status.as_u16(), error = %detail, "request failed");
            let mut response = Reply::failure(status, GENERIC_FAILURE).into_response();
            response.extensions_mut().insert(FailureDetail(detail));
            return response;
        }

        match self {
            Self::Validation { message, fields } => {
                Reply::failure(status, message).with_field_errors(fields).into_response()
            }
            other => Reply::failure(status, other.to_string()).into_response(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
