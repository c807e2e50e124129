//! Error taxonomy shared by the policy, lifecycle and repository layers, and its
//! translation into the JSON failure envelope.

use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

/// FieldError
///
/// One entry of a validation failure: which input field, and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error")]
    Validation(Vec<FieldError>),

    #[error("not found: {0}")]
    NotFound(String),

    /// Missing or invalid credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credential, but the policy denies the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unknown error: {0}")]
    Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AppError {
    pub fn invalid(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    /// Wraps an arbitrary failure as `Unknown`.
    pub fn unknown(message: impl Into<String>) -> Self {
        AppError::Unknown(message.into().into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Unknown(Box::new(e))
    }
}

// Malformed bodies are reported through the same envelope as field validation.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", &rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::invalid("body", &e.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(errors) => json!({
                "status": "fail",
                "message": "Validation error",
                "errors": errors,
            }),
            AppError::NotFound(message)
            | AppError::Unauthorized(message)
            | AppError::Forbidden(message)
            | AppError::Conflict(message) => json!({
                "status": "fail",
                "message": message,
            }),
            AppError::Unknown(source) => {
                // The cause stays in the server log; callers get a generic message.
                tracing::error!(error = %source, "request failed with an unexpected error");
                json!({
                    "status": "error",
                    "message": "Something went wrong",
                })
            }
        };
        (status, Json(body)).into_response()
    }
}
