//! Uniform result contract shared by the gateway and the client wrapper.
//!
//! - [`GatewayResult<T>`]: `Result<T, GatewayError>`
//! - [`ErrorKind`]: wire-level error taxonomy
//! - [`GatewayEnvelope`]: the `{ ok, data | error, message, retry_after }` JSON shape

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use utoipa::ToSchema;

/// Result type returned by every public gateway and client operation
pub type GatewayResult<T> = Result<T, GatewayError>;

// ============================================================================
// Error Kinds
// ============================================================================

/// Error kinds as they appear in the `error` field of a failed envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Body is not JSON or lacks an `action`
    InvalidRequest,
    /// `action` names no known handler
    UnknownAction,
    /// Missing or unparseable bearer token
    Unauthorized,
    /// HTTP method other than POST/OPTIONS
    MethodNotAllowed,
    /// Payload field failed sanitizing or shape checks
    InvalidInput,
    /// Barcode is not 8 or 13 digits
    InvalidEan,
    /// Barcode fails the GS1 checksum
    InvalidEanChecksum,
    /// Sliding window exhausted; carries `retry_after`
    RateLimitExceeded,
    /// Backend stored procedure returned an error
    RpcError,
    /// Unexpected fault inside the gateway
    InternalError,
    /// Client could reach neither the gateway nor the backend
    GatewayUnreachable,
    /// Primary gateway invocation failed in an unexpected way
    GatewayException,
    /// Backend demands a captcha challenge
    CaptchaRequired,
    /// Backend rejected a captcha answer
    CaptchaFailed,
    /// Any kind this build does not know about
    #[serde(other)]
    Unrecognized,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnknownAction => "unknown_action",
            Self::Unauthorized => "unauthorized",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::InvalidInput => "invalid_input",
            Self::InvalidEan => "invalid_ean",
            Self::InvalidEanChecksum => "invalid_ean_checksum",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::RpcError => "rpc_error",
            Self::InternalError => "internal_error",
            Self::GatewayUnreachable => "gateway_unreachable",
            Self::GatewayException => "gateway_exception",
            Self::CaptchaRequired => "captcha_required",
            Self::CaptchaFailed => "captcha_failed",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// HTTP status used when the gateway emits this kind.
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidRequest
            | Self::UnknownAction
            | Self::InvalidInput
            | Self::InvalidEan
            | Self::InvalidEanChecksum
            | Self::RpcError
            | Self::CaptchaRequired
            | Self::CaptchaFailed => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError
            | Self::GatewayUnreachable
            | Self::GatewayException
            | Self::Unrecognized => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GatewayError
// ============================================================================

/// Structured failure. Never carries a stack trace or internal detail for
/// `internal_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
    /// Seconds until the caller may retry (rate limit only)
    pub retry_after: Option<u64>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::new(
            ErrorKind::UnknownAction,
            format!("Unknown action: {}", action),
        )
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            kind: ErrorKind::RateLimitExceeded,
            message: format!(
                "Rate limit exceeded. Try again in {} seconds",
                retry_after
            ),
            retry_after: Some(retry_after),
        }
    }

    /// Generic internal error; the cause is logged, not returned.
    pub fn internal() -> Self {
        Self::new(ErrorKind::InternalError, "An internal error occurred")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ErrorKind::MethodNotAllowed, "Method not allowed")
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.kind.http_status();
        let retry_after = self.retry_after;
        let mut response = (status, Json(GatewayEnvelope::failure(self))).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// ============================================================================
// Wire Envelope
// ============================================================================

/// JSON shape of a [`GatewayResult`] on the wire.
///
/// Exactly one side is populated: `data` when `ok` is true, otherwise
/// `error` + `message` (+ `retry_after` for rate limits).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatewayEnvelope {
    #[schema(example = true)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = 3600)]
    pub retry_after: Option<u64>,
}

impl GatewayEnvelope {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            message: None,
            retry_after: None,
        }
    }

    pub fn failure(err: GatewayError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(err.kind),
            message: Some(err.message),
            retry_after: err.retry_after,
        }
    }

    /// Decode back into a result. A failed envelope missing `error` decodes
    /// as [`ErrorKind::Unrecognized`].
    pub fn into_result(self) -> GatewayResult<Value> {
        if self.ok {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let kind = self.error.unwrap_or(ErrorKind::Unrecognized);
        Err(GatewayError {
            kind,
            message: self.message.unwrap_or_default(),
            retry_after: self
                .retry_after
                .filter(|_| kind == ErrorKind::RateLimitExceeded),
        })
    }
}

impl From<GatewayResult<Value>> for GatewayEnvelope {
    fn from(result: GatewayResult<Value>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let env = GatewayEnvelope::success(json!({"id": 7}));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire, json!({"ok": true, "data": {"id": 7}}));
    }

    #[test]
    fn test_failure_envelope_omits_retry_after_unless_rate_limited() {
        let env = GatewayEnvelope::failure(GatewayError::invalid_input("name is required"));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({"ok": false, "error": "invalid_input", "message": "name is required"})
        );

        let env = GatewayEnvelope::failure(GatewayError::rate_limited(42));
        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(wire["error"], "rate_limit_exceeded");
        assert_eq!(wire["retry_after"], 42);
    }

    #[test]
    fn test_into_result_roundtrips_error_kind() {
        let env: GatewayEnvelope = serde_json::from_value(json!({
            "ok": false,
            "error": "invalid_ean_checksum",
            "message": "ean checksum mismatch"
        }))
        .unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidEanChecksum);
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_unknown_kind_decodes_as_unrecognized() {
        let env: GatewayEnvelope =
            serde_json::from_value(json!({"ok": false, "error": "quota_burned"})).unwrap();
        let err = env.into_result().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unrecognized);
        assert_eq!(err.message, "");
    }

    #[test]
    fn test_result_envelope_roundtrip() {
        let ok: GatewayResult<Value> = Ok(json!({"id": 3}));
        let env = GatewayEnvelope::from(ok.clone());
        assert!(env.ok);
        assert_eq!(env.into_result(), ok);

        let limited: GatewayResult<Value> = Err(GatewayError::rate_limited(30));
        let wire = serde_json::to_value(GatewayEnvelope::from(limited.clone())).unwrap();
        let decoded: GatewayEnvelope = serde_json::from_value(wire).unwrap();
        assert_eq!(decoded.into_result(), limited);

        let rejected: GatewayResult<Value> = Err(GatewayError::unknown_action("nope"));
        assert_eq!(GatewayEnvelope::from(rejected.clone()).into_result(), rejected);
    }

    #[test]
    fn test_ok_without_data_is_null() {
        let env: GatewayEnvelope = serde_json::from_value(json!({"ok": true})).unwrap();
        assert_eq!(env.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorKind::Unauthorized.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ErrorKind::RateLimitExceeded.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(ErrorKind::InvalidEan.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::MethodNotAllowed.http_status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            ErrorKind::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_response_sets_retry_after_header() {
        let response = GatewayError::rate_limited(120).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "120");
    }

    #[test]
    fn test_kind_display_matches_wire_name() {
        assert_eq!(ErrorKind::GatewayUnreachable.to_string(), "gateway_unreachable");
        let wire = serde_json::to_value(ErrorKind::CaptchaRequired).unwrap();
        assert_eq!(wire, "captcha_required");
    }
}
