//! Custom extractors that convert axum rejections to structured AppError responses.
//!
//! Use `AppJson<T>` in handler signatures instead of `axum::Json<T>`:
//! deserialization failures then produce the same JSON `AppError` body as
//! every other validation failure, rather than axum's plain-text 422.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use crate::error::AppError;

pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(map_json_rejection(rejection)),
        }
    }
}

fn map_json_rejection(rejection: JsonRejection) -> AppError {
    let body_text = rejection.body_text();
    AppError::Validation {
        field: serde_field_hint(&body_text).or_else(|| Some("body".to_string())),
        message: format!("Invalid request body: {body_text}"),
        received: None,
        docs_hint: Some(
            "Check the request body against the endpoint's schema (GET /api-doc/openapi.json)."
                .to_string(),
        ),
    }
}

/// Pull a field name out of serde's "missing field `x`" / "unknown field `x`"
/// messages, when one is present.
fn serde_field_hint(msg: &str) -> Option<String> {
    for marker in ["missing field `", "unknown field `"] {
        if let Some(rest) = msg.split(marker).nth(1) {
            if let Some((field, _)) = rest.split_once('`') {
                return Some(field.to_string());
            }
        }
    }
    None
}
