//! User identification at the HTTP boundary.
//!
//! Identity arrives as an `x-user-id` UUID header supplied by the fronting
//! web layer; session management itself lives outside this service.

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::error::AppError;

/// Read and parse the `x-user-id` header, or fail with a 400 naming it.
pub fn require_user_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get("x-user-id")
        .ok_or_else(|| AppError::Validation {
            message: "x-user-id header is required".to_string(),
            field: Some("headers.x-user-id".to_string()),
            received: None,
            docs_hint: Some("Pass the authenticated user's UUID as the x-user-id header.".to_string()),
        })?
        .to_str()
        .map_err(|_| AppError::Validation {
            message: "x-user-id must be a valid UTF-8 string".to_string(),
            field: Some("headers.x-user-id".to_string()),
            received: None,
            docs_hint: None,
        })?;

    Uuid::parse_str(raw).map_err(|_| AppError::Validation {
        message: "x-user-id must be a valid UUID".to_string(),
        field: Some("headers.x-user-id".to_string()),
        received: Some(serde_json::Value::String(raw.to_string())),
        docs_hint: Some(
            "Use a valid UUID, e.g. 'a1b2c3d4-e5f6-7890-abcd-ef1234567890'".to_string(),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_a_valid_uuid_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-user-id",
            HeaderValue::from_static("a1b2c3d4-e5f6-7890-abcd-ef1234567890"),
        );
        let user_id = require_user_id(&headers).expect("valid header should parse");
        assert_eq!(
            user_id.to_string(),
            "a1b2c3d4-e5f6-7890-abcd-ef1234567890"
        );
    }

    #[test]
    fn missing_header_is_a_validation_error() {
        let err = require_user_id(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn malformed_uuid_is_a_validation_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-uuid"));
        let err = require_user_id(&headers).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
