//! Client-side gateway wrapper.
//!
//! Every write goes to the gateway first. If the gateway cannot be reached
//! the same call is made once, directly against the backend, skipping the
//! gateway's rate limits and validation. There is no retry loop and no
//! timeout beyond the transport's own.
//!
//! ```text
//! invoke ──ok:bool──────────────▶ envelope, verbatim
//!    │  ├─2xx, no ok───────────▶ Ok(raw body)
//!    │  └─non-2xx, no ok──┐
//!    ├─Unreachable────────┴──▶ fallback ─ok────────▶ Ok(data)
//!    │                                   ├─Rpc──────▶ rpc_error
//!    │                                   └─Transport/panic ▶ gateway_unreachable
//!    ├─Failed──────────────▶ gateway_exception
//!    └─panic───────────────▶ gateway_exception
//! ```

pub mod transport;

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::actions::{ProductSubmission, SavedSearch, ScanRecord, TrackedEvent};
use crate::backend::{Backend, BackendCall, BackendError};
use crate::result::{ErrorKind, GatewayEnvelope, GatewayError, GatewayResult};

pub use transport::{GatewayTransport, HttpGatewayTransport, TransportError, TransportResponse};

const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

pub struct GatewayClient {
    transport: Arc<dyn GatewayTransport>,
    backend: Arc<dyn Backend>,
}

impl GatewayClient {
    pub fn new(transport: Arc<dyn GatewayTransport>, backend: Arc<dyn Backend>) -> Self {
        Self { transport, backend }
    }

    pub async fn record_scan(&self, auth_token: &str, ean: &str) -> GatewayResult<Value> {
        let call = BackendCall::RecordScan(ScanRecord {
            ean: ean.to_string(),
        });
        self.execute(auth_token, call).await
    }

    pub async fn submit_product(
        &self,
        auth_token: &str,
        submission: ProductSubmission,
    ) -> GatewayResult<Value> {
        self.execute(auth_token, BackendCall::SubmitProduct(submission))
            .await
    }

    pub async fn track_event(&self, auth_token: &str, event: TrackedEvent) -> GatewayResult<Value> {
        self.execute(auth_token, BackendCall::TrackEvent(event)).await
    }

    pub async fn save_search(&self, auth_token: &str, search: SavedSearch) -> GatewayResult<Value> {
        self.execute(auth_token, BackendCall::SaveSearch(search)).await
    }

    /// Primary gateway call with single-shot backend fallback.
    pub async fn execute(&self, auth_token: &str, call: BackendCall) -> GatewayResult<Value> {
        let primary = AssertUnwindSafe(self.transport.invoke(auth_token, call.gateway_body()))
            .catch_unwind()
            .await;

        let response = match primary {
            Ok(Ok(response)) => response,
            Ok(Err(TransportError::Unreachable(reason))) => {
                return self.fallback(auth_token, call, &reason).await;
            }
            Ok(Err(TransportError::Failed(message))) => {
                warn!(action = %call.action(), reason = %message, "[CLIENT] gateway call failed");
                return Err(GatewayError::new(ErrorKind::GatewayException, message));
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(action = %call.action(), reason = %message, "[CLIENT] gateway call panicked");
                return Err(GatewayError::new(ErrorKind::GatewayException, message));
            }
        };

        match classify(response) {
            Ok(result) => result,
            Err(reason) => self.fallback(auth_token, call, &reason).await,
        }
    }

    /// Direct backend call, bypassing the gateway.
    async fn fallback(
        &self,
        auth_token: &str,
        call: BackendCall,
        reason: &str,
    ) -> GatewayResult<Value> {
        let action = call.action();
        warn!(%action, %reason, "[CLIENT] gateway unreachable, calling backend directly");

        let outcome = AssertUnwindSafe(self.backend.call(auth_token, call))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(data)) => {
                debug!(%action, "[CLIENT] fallback succeeded");
                Ok(data)
            }
            Ok(Err(BackendError::Rpc { message, .. })) => {
                Err(GatewayError::new(ErrorKind::RpcError, message))
            }
            Ok(Err(BackendError::Transport(detail))) => {
                warn!(%action, %detail, "[CLIENT] fallback failed");
                Err(unreachable_error())
            }
            Err(panic) => {
                warn!(%action, reason = %panic_message(panic.as_ref()), "[CLIENT] fallback panicked");
                Err(unreachable_error())
            }
        }
    }
}

fn unreachable_error() -> GatewayError {
    GatewayError::new(
        ErrorKind::GatewayUnreachable,
        "Gateway unreachable and direct backend call failed",
    )
}

/// Interpret a gateway response.
///
/// `Err(reason)` means the response did not come from the gateway (no `ok`
/// field on a non-2xx answer) and the caller should fall back.
fn classify(response: TransportResponse) -> Result<GatewayResult<Value>, String> {
    let ok = response.body.get("ok").and_then(Value::as_bool);

    let Some(ok) = ok else {
        if response.is_success() {
            return Ok(Ok(response.body));
        }
        return Err(format!("HTTP {} without gateway envelope", response.status));
    };

    match serde_json::from_value::<GatewayEnvelope>(response.body) {
        Ok(envelope) => Ok(envelope.into_result()),
        Err(_) if ok => Ok(Ok(Value::Null)),
        Err(_) => Ok(Err(GatewayError::new(
            ErrorKind::Unrecognized,
            "Malformed gateway error response",
        ))),
    }
}

/// Message of a caught panic; non-string payloads get a generic message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    UNEXPECTED_ERROR.to_string()
}
