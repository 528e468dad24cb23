//! Downstream backend stored-procedure calls.
//!
//! The gateway forwards each validated action to one backend function; the
//! client wrapper calls the same functions directly when the gateway cannot
//! be reached. Both sides go through the [`Backend`] trait.

pub mod rest;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::actions::{Action, ProductSubmission, SavedSearch, ScanRecord, TrackedEvent};
use crate::result::{ErrorKind, GatewayError};

pub use rest::RestBackend;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Backend answered with an error
    #[error("{message}")]
    Rpc {
        message: String,
        code: Option<String>,
    },

    /// Backend could not be reached or its answer could not be decoded
    #[error("Backend transport error: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            message: message.into(),
            code: None,
        }
    }

    /// Captcha kind surfaced by the backend, matched on code or message.
    pub fn captcha_kind(&self) -> Option<ErrorKind> {
        let Self::Rpc { message, code } = self else {
            return None;
        };
        [code.as_deref(), Some(message.as_str())]
            .into_iter()
            .flatten()
            .find_map(|s| match s {
                "captcha_required" => Some(ErrorKind::CaptchaRequired),
                "captcha_failed" => Some(ErrorKind::CaptchaFailed),
                _ => None,
            })
    }
}

/// Gateway-side mapping. Transport details are not returned to the caller.
impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        if let Some(kind) = err.captcha_kind() {
            return GatewayError::new(kind, err.to_string());
        }
        match err {
            BackendError::Rpc { message, .. } => GatewayError::new(ErrorKind::RpcError, message),
            BackendError::Transport(_) => GatewayError::internal(),
        }
    }
}

// ============================================================================
// BackendCall
// ============================================================================

/// A validated write, ready to be sent to its backend function.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    RecordScan(ScanRecord),
    SubmitProduct(ProductSubmission),
    TrackEvent(TrackedEvent),
    SaveSearch(SavedSearch),
}

impl BackendCall {
    pub fn action(&self) -> Action {
        match self {
            Self::RecordScan(_) => Action::RecordScan,
            Self::SubmitProduct(_) => Action::SubmitProduct,
            Self::TrackEvent(_) => Action::TrackEvent,
            Self::SaveSearch(_) => Action::SaveSearch,
        }
    }

    pub fn function_name(&self) -> &'static str {
        match self {
            Self::RecordScan(_) => "record_scan",
            Self::SubmitProduct(_) => "submit_product",
            Self::TrackEvent(_) => "track_event",
            Self::SaveSearch(_) => "save_search",
        }
    }

    /// Backend function parameters. Every parameter is always present;
    /// absent optional values are sent as `null`.
    pub fn params(&self) -> Value {
        match self {
            Self::RecordScan(scan) => json!({ "p_ean": scan.ean }),
            Self::SubmitProduct(p) => json!({
                "p_ean": p.ean,
                "p_product_name": p.product_name,
                "p_brand": p.brand,
                "p_category": p.category,
                "p_photo_url": p.photo_url,
                "p_notes": p.notes,
            }),
            Self::TrackEvent(e) => json!({
                "p_event_name": e.event_name,
                "p_event_data": e.event_data,
                "p_session_id": e.session_id,
                "p_device_type": e.device_type.map(|d| d.as_str()),
            }),
            Self::SaveSearch(s) => json!({
                "p_name": s.name,
                "p_query": s.query,
                "p_filters": s.filters,
            }),
        }
    }

    /// Gateway request body: `{"action": ..., ...payload}`.
    pub fn gateway_body(&self) -> Value {
        let payload = match self {
            Self::RecordScan(p) => serde_json::to_value(p),
            Self::SubmitProduct(p) => serde_json::to_value(p),
            Self::TrackEvent(p) => serde_json::to_value(p),
            Self::SaveSearch(p) => serde_json::to_value(p),
        };
        let mut body = match payload {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        body.insert("action".into(), Value::from(self.action().as_str()));
        Value::Object(body)
    }
}

/// Backend that executes stored-procedure calls on behalf of a caller.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `auth_token` is the caller's own bearer token; the backend
    /// authorizes the write as that caller.
    async fn call(&self, auth_token: &str, call: BackendCall) -> Result<Value, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::DeviceType;

    fn event() -> TrackedEvent {
        let mut data = Map::new();
        data.insert("screen".into(), json!("home"));
        TrackedEvent {
            event_name: "app_open".into(),
            event_data: data,
            session_id: None,
            device_type: Some(DeviceType::Mobile),
        }
    }

    #[test]
    fn test_params_use_prefixed_names() {
        let call = BackendCall::TrackEvent(event());
        assert_eq!(call.function_name(), "track_event");
        assert_eq!(
            call.params(),
            json!({
                "p_event_name": "app_open",
                "p_event_data": {"screen": "home"},
                "p_session_id": null,
                "p_device_type": "mobile",
            })
        );
    }

    #[test]
    fn test_submit_params_send_nulls_for_absent_fields() {
        let call = BackendCall::SubmitProduct(ProductSubmission {
            ean: "5901234123457".into(),
            product_name: "X".into(),
            brand: Some("Acme".into()),
            category: None,
            photo_url: None,
            notes: None,
        });
        let params = call.params();
        assert_eq!(params["p_brand"], "Acme");
        assert!(params["p_category"].is_null());
        assert_eq!(params.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_gateway_body_carries_action() {
        let call = BackendCall::RecordScan(ScanRecord {
            ean: "96385074".into(),
        });
        assert_eq!(
            call.gateway_body(),
            json!({"action": "record-scan", "ean": "96385074"})
        );

        let body = BackendCall::SaveSearch(SavedSearch {
            name: "n".into(),
            query: None,
            filters: Map::new(),
        })
        .gateway_body();
        assert_eq!(body, json!({"action": "save-search", "name": "n", "filters": {}}));
    }

    #[test]
    fn test_error_mapping() {
        let err: GatewayError = BackendError::rpc("duplicate ean").into();
        assert_eq!(err.kind, ErrorKind::RpcError);
        assert_eq!(err.message, "duplicate ean");

        let err: GatewayError = BackendError::Rpc {
            message: "Please solve the challenge".into(),
            code: Some("captcha_required".into()),
        }
        .into();
        assert_eq!(err.kind, ErrorKind::CaptchaRequired);

        let err: GatewayError = BackendError::rpc("captcha_failed").into();
        assert_eq!(err.kind, ErrorKind::CaptchaFailed);

        let err: GatewayError = BackendError::Transport("connection refused".into()).into();
        assert_eq!(err.kind, ErrorKind::InternalError);
        assert!(!err.message.contains("refused"));
    }
}
