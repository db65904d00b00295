//! The `{success, message?, data?, errors?}` body every endpoint returns.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use stockroom_engine::FieldErrors;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize)]
pub struct Reply {
    #[serde(skip)]
    status: StatusCode,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            message: None,
            data: None,
            errors: None,
        }
    }

    pub fn created() -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok()
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            message: Some(message.into()),
            data: None,
            errors: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: impl Serialize) -> ServerResult<Self> {
        self.data = Some(to_value(data)?);
        Ok(self)
    }

    pub fn with_errors(mut self, errors: impl Serialize) -> ServerResult<Self> {
        self.errors = Some(to_value(errors)?);
        Ok(self)
    }

    /// Attach per-field validation messages; an empty map attaches nothing.
    pub fn with_field_errors(mut self, fields: FieldErrors) -> Self {
        if !fields.is_empty() {
            self.errors = Some(Value::Object(
                fields
                    .into_iter()
                    .map(|(field, messages)| {
                        let messages = messages.into_iter().map(Value::String).collect();
                        (field, Value::Array(messages))
                    })
                    .collect(),
            ));
        }
        self
    }
}

fn to_value(value: impl Serialize) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(format!("encode response: {e}")))
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
