//! HTTP error responses.
//!
//! [`ApiError`] turns coordinator failures into `{"error": "..."}` bodies.
//! Malformed submissions never have their input echoed back; a bad status
//! filter does get its message, since it only names the valid values.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use taskgate_tasks::TaskError;

/// An error returned from a gateway handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body could not be used.
    #[error("invalid request")]
    InvalidRequest,

    /// A query parameter was rejected; the message is safe to return.
    #[error("{0}")]
    BadQuery(String),

    /// Any coordinator failure.
    #[error(transparent)]
    Task(#[from] TaskError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::BadQuery(_) => StatusCode::BAD_REQUEST,
            Self::Task(TaskError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Task(TaskError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The text placed in the response body.
    pub fn message(&self) -> String {
        match self {
            Self::InvalidRequest | Self::Task(TaskError::InvalidRequest(_)) => {
                "invalid request".to_string()
            },
            Self::BadQuery(message) => message.clone(),
            Self::Task(TaskError::NotFound { .. }) => "task not found".to_string(),
            Self::Task(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}
