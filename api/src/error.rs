use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nosh_core::error::{self, ApiError};
use nosh_core::extraction::ExtractionError;
use nosh_core::payload::ValidationError;

use crate::ai::AiError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Client-side validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// The model service could not be reached or rejected the call (502)
    AiUnavailable { message: String },
    /// The model answered, but no valid payload could be recovered from its
    /// completion (502). Carries the failure kind for diagnostics.
    AiPayload {
        code: &'static str,
        message: String,
        field: Option<String>,
    },
    /// Database error (500)
    Database(sqlx::Error),
    /// Internal error (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    error_code: None,
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::AiUnavailable { message } => {
                tracing::warn!(error = %message, "model service unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::AI_UNAVAILABLE.to_string(),
                        error_code: None,
                        message: "The AI service is currently unavailable".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some("Retry in a moment.".to_string()),
                    },
                )
            }
            AppError::AiPayload {
                code,
                message,
                field,
            } => {
                tracing::warn!(failure_kind = code, error = %message, "unusable model completion");
                (
                    StatusCode::BAD_GATEWAY,
                    ApiError {
                        error: error::codes::AI_PAYLOAD_INVALID.to_string(),
                        error_code: Some(code.to_string()),
                        message,
                        field,
                        received: None,
                        request_id,
                        docs_hint: Some(
                            "The model returned an unusable completion. Retrying usually succeeds."
                                .to_string(),
                        ),
                    },
                )
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        error_code: None,
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        error_code: None,
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err)
    }
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::MissingApiKey => AppError::Internal(err.to_string()),
            other => AppError::AiUnavailable {
                message: other.to_string(),
            },
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        AppError::AiPayload {
            code: err.code(),
            message: err.to_string(),
            field: None,
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        AppError::AiPayload {
            code: err.code(),
            message: err.to_string(),
            field: Some(field),
        }
    }
}
