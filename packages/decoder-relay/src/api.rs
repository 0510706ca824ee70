//! Response envelope, error mapping and bearer auth shared by every route.
//!
//! Every JSON response has the same outer shape:
//!
//! ```text
//! { "success": bool, "message": str, "timestamp": str,
//!   "data"?: any, "error"?: str, "details"?: str,
//!   "accessibility": { "screen_reader_summary": str,
//!                      "data_type"?: str, "suggested_action"?: str } }
//! ```

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ── Envelope ─────────────────────────────────────────────────────────────────

/// The JSON envelope wrapped around every response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub accessibility: Accessibility,
}

/// Screen-reader friendly summary attached to every envelope.
#[derive(Debug, Serialize)]
pub struct Accessibility {
    pub screen_reader_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<&'static str>,
}

const SUGGESTED_ACTION: &str = "Please try again or contact support";

impl<T: Serialize> ApiResponse<T> {
    /// A successful response carrying `data`.
    pub fn success(data: T, message: impl Into<String>) -> Json<Self> {
        let message = message.into();
        Json(Self {
            success: true,
            accessibility: Accessibility {
                screen_reader_summary: message.clone(),
                data_type: Some(short_type_name::<T>()),
                suggested_action: None,
            },
            message,
            timestamp: now_iso(),
            data: Some(data),
            error: None,
            details: None,
        })
    }
}

/// Last path segment of `T`'s type name, e.g. `UploadResponse`.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Current UTC time as RFC 3339.
pub fn now_iso() -> String {
    decoder_core::time::to_rfc3339(&chrono::Utc::now())
}

/// The part of a user hash that may appear in logs.
pub fn short_hash(user_hash: &str) -> String {
    let prefix: String = user_hash.chars().take(8).collect();
    format!("{}...", prefix)
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Errors a handler can return. Each maps to a status code and an error
/// envelope.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Valid authentication token required")]
    Unauthorized,

    #[error("{0}")]
    MissingFields(&'static str),

    #[error("Request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("Sync blob is {size} bytes, the limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Request body exceeds the size limit")]
    BodyTooLarge,

    #[error("Too many requests. Please wait before trying again.")]
    RateLimited,

    #[error("The requested endpoint does not exist")]
    NotFound,

    #[error("Sync storage failed: {0}")]
    Storage(String),

    #[error("Behavior library unavailable: {0}")]
    Library(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::MissingFields(_) | RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge { .. } | RelayError::BodyTooLarge => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::Storage(_) | RelayError::Library(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short error title for the `error` field.
    fn title(&self) -> &'static str {
        match self {
            RelayError::Unauthorized => "Unauthorized",
            RelayError::MissingFields(_) => "Missing required fields",
            RelayError::InvalidBody(_) => "Invalid request",
            RelayError::PayloadTooLarge { .. } | RelayError::BodyTooLarge => "Payload too large",
            RelayError::RateLimited => "Rate Limit Exceeded",
            RelayError::NotFound => "Not Found",
            RelayError::Storage(_) => "Sync failed",
            RelayError::Library(_) => "Failed to load behaviors",
        }
    }

    /// Client-facing details. Internal failures do not leak their cause.
    fn details(&self) -> String {
        match self {
            RelayError::Storage(_) => "Unable to sync data. Please try again.".to_string(),
            RelayError::Library(_) => "Unable to retrieve the behavior library.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<JsonRejection> for RelayError {
    fn from(rejection: JsonRejection) -> Self {
        // Bodies past the router's limit fail while buffering
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return RelayError::BodyTooLarge;
        }
        RelayError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let title = self.title();
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            message: title.to_string(),
            timestamp: now_iso(),
            data: None,
            error: Some(title.to_string()),
            details: Some(self.details()),
            accessibility: Accessibility {
                screen_reader_summary: format!("Error: {}", title),
                data_type: None,
                suggested_action: Some(SUGGESTED_ACTION),
            },
        };
        (status, Json(body)).into_response()
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────────

/// A non-empty `Authorization: Bearer <token>` header.
///
/// The token itself is not verified.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken;

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = RelayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|_| BearerToken)
            .ok_or(RelayError::Unauthorized)
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> RelayError {
    RelayError::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(RelayError::MissingFields("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::PayloadTooLarge { size: 2, limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(RelayError::BodyTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(RelayError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(RelayError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            RelayError::Storage("disk full".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_generic() {
        let err = RelayError::Storage("/data/sync/abc.json: disk full".into());
        assert!(!err.details().contains("/data"));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash("0123456789abcdef"), "01234567...");
        assert_eq!(short_hash("abc"), "abc...");
    }

    #[test]
    fn test_success_envelope() {
        let Json(body) = ApiResponse::success(serde_json::json!({"k": 1}), "ok");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "ok");
        assert_eq!(value["data"]["k"], 1);
        assert!(value.get("error").is_none());
        assert_eq!(value["accessibility"]["screen_reader_summary"], "ok");
        assert_eq!(value["accessibility"]["data_type"], "Value");
        assert!(value["accessibility"].get("suggested_action").is_none());
    }

    #[tokio::test]
    async fn test_error_envelope_accessibility() {
        let response = RelayError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "Rate Limit Exceeded");
        assert_eq!(
            value["accessibility"]["screen_reader_summary"],
            "Error: Rate Limit Exceeded"
        );
        assert_eq!(
            value["accessibility"]["suggested_action"],
            "Please try again or contact support"
        );
        assert!(value["accessibility"].get("data_type").is_none());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<serde_json::Value>(), "Value");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
    }
}
