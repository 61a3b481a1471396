//! HTTP mapping of brevity errors.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use brevity_core::{Error, ErrorKind};

/// Error returned by every handler.
///
/// Messages carried here are already safe to show to an end user.
#[derive(Debug)]
pub enum ApiError {
    Validation {
        field: Option<String>,
        message: String,
    },
    Unauthorized(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::BadGateway(message)
            | ApiError::Internal(message) => message,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let message = err.user_message();
        match err.kind() {
            ErrorKind::Validation => {
                let field = match &err {
                    Error::Validation(errors) => errors.first().map(|e| e.field.clone()),
                    _ => None,
                };
                ApiError::Validation { field, message }
            }
            ErrorKind::Authentication => ApiError::Unauthorized(message),
            ErrorKind::NotFound => ApiError::NotFound(message),
            ErrorKind::Upstream | ErrorKind::StreamInterrupted => {
                tracing::warn!(subsystem = "api", error = %err, "Collaborator failure");
                ApiError::BadGateway(message)
            }
            ErrorKind::Internal => {
                tracing::error!(subsystem = "api", error = %err, "Internal error");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(subsystem = "api", error = %rejection.body_text(), "Rejected request body");
        ApiError::Validation {
            field: Some("body".to_string()),
            message: "Invalid request body".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation {
                field: Some(field),
                message,
            } => json!({ "error": message, "field": field }),
            other => json!({ "error": other.message() }),
        };

        (status, Json(body)).into_response()
    }
}
