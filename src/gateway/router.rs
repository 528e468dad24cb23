//! Action routing: rate check → validation → backend forward.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::actions::{ActionLimits, GatewayRequest};
use crate::auth::AuthenticatedCaller;
use crate::backend::{Backend, BackendCall, BackendError};
use crate::rate_limit::{RateLimitKey, RateLimitStore};
use crate::result::{GatewayError, GatewayResult};

/// Maps an authenticated request to its validator and backend function.
pub struct ActionRouter {
    limiter: Arc<dyn RateLimitStore>,
    limits: ActionLimits,
    backend: Arc<dyn Backend>,
}

impl ActionRouter {
    pub fn new(
        limiter: Arc<dyn RateLimitStore>,
        limits: ActionLimits,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            limiter,
            limits,
            backend,
        }
    }

    /// Route one request for an already authenticated caller.
    ///
    /// Order: action lookup, rate check, payload validation, forward. A
    /// request rejected by the limiter is never validated; a request that
    /// fails validation still consumed its rate-limit slot.
    pub async fn dispatch(
        &self,
        caller: &AuthenticatedCaller,
        request: GatewayRequest,
    ) -> GatewayResult<Value> {
        let action = request.resolve().inspect_err(|_| {
            warn!(user_id = %caller.user_id, action = %request.action, "[GATEWAY] unknown action");
        })?;

        let key = RateLimitKey::new(caller.user_id.as_str(), action.as_str());
        let decision = self.limiter.check(&key, &self.limits.get(action)).await;
        if !decision.allowed {
            let retry_after = decision.retry_after.unwrap_or(1);
            warn!(%key, retry_after, "[GATEWAY] rate limit exceeded");
            return Err(GatewayError::rate_limited(retry_after));
        }

        let call = action.validate(&request.payload).inspect_err(|e| {
            warn!(%key, kind = %e.kind, reason = %e.message, "[GATEWAY] validation failed");
        })?;

        self.forward(caller, call).await
    }

    /// Forward a validated call. Backend errors and panics become structured
    /// errors; transport details are only logged.
    async fn forward(&self, caller: &AuthenticatedCaller, call: BackendCall) -> GatewayResult<Value> {
        let function = call.function_name();
        let outcome = AssertUnwindSafe(self.backend.call(&caller.token, call))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(data)) => {
                info!(user_id = %caller.user_id, function, "[GATEWAY] forwarded");
                Ok(data)
            }
            Ok(Err(err)) => {
                match &err {
                    BackendError::Rpc { message, code } => {
                        warn!(function, reason = %message, ?code, "[GATEWAY] backend rejected call");
                    }
                    BackendError::Transport(detail) => {
                        error!(function, %detail, "[GATEWAY] backend unreachable");
                    }
                }
                Err(err.into())
            }
            Err(_) => {
                error!(function, "[GATEWAY] panic while forwarding");
                Err(GatewayError::internal())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::rate_limit::{ManualClock, RateLimitConfig, SlidingWindowLimiter};
    use crate::result::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records calls; fails on demand by search name.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        async fn call(&self, auth_token: &str, call: BackendCall) -> Result<Value, BackendError> {
            let params = call.params();
            self.calls.lock().unwrap().push((
                auth_token.to_string(),
                call.function_name().to_string(),
                params.clone(),
            ));
            match params["p_name"].as_str() {
                Some("dup") => Err(BackendError::rpc("search already exists")),
                Some("offline") => Err(BackendError::Transport("connection reset".into())),
                Some("boom") => panic!("backend exploded"),
                _ => Ok(json!({"id": 1})),
            }
        }
    }

    fn router(backend: Arc<RecordingBackend>, limits: ActionLimits) -> ActionRouter {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let limiter = Arc::new(SlidingWindowLimiter::with_clock(Duration::from_secs(60), clock));
        ActionRouter::new(limiter, limits, backend)
    }

    fn caller() -> AuthenticatedCaller {
        AuthenticatedCaller {
            user_id: "user-1".into(),
            token: "raw-token".into(),
        }
    }

    fn request(body: Value) -> GatewayRequest {
        GatewayRequest::from_slice(body.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_forwards_with_caller_token() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router(backend.clone(), ActionLimits::default());

        let out = router
            .dispatch(&caller(), request(json!({"action": "record-scan", "ean": "96385074"})))
            .await
            .unwrap();
        assert_eq!(out, json!({"id": 1}));

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "raw-token");
        assert_eq!(calls[0].1, "record_scan");
        assert_eq!(calls[0].2, json!({"p_ean": "96385074"}));
    }

    #[tokio::test]
    async fn test_rate_limit_checked_before_validation() {
        let backend = Arc::new(RecordingBackend::default());
        let limits =
            ActionLimits::default().with(Action::SaveSearch, RateLimitConfig::new(1, 3600));
        let router = router(backend.clone(), limits);

        // invalid payload still consumes the slot
        let err = router
            .dispatch(&caller(), request(json!({"action": "save-search"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInput);

        let err = router
            .dispatch(&caller(), request(json!({"action": "save-search", "name": "ok"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RateLimitExceeded);
        assert_eq!(err.retry_after, Some(3601));
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_does_not_touch_limiter_or_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router(backend.clone(), ActionLimits::default());
        let err = router
            .dispatch(&caller(), request(json!({"action": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownAction);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backend_errors_are_mapped() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router(backend, ActionLimits::default());

        let err = router
            .dispatch(&caller(), request(json!({"action": "save-search", "name": "dup"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::RpcError);
        assert_eq!(err.message, "search already exists");

        let err = router
            .dispatch(&caller(), request(json!({"action": "save-search", "name": "offline"})))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::internal());
    }

    #[tokio::test]
    async fn test_backend_panic_is_caught() {
        let backend = Arc::new(RecordingBackend::default());
        let router = router(backend, ActionLimits::default());
        let err = router
            .dispatch(&caller(), request(json!({"action": "save-search", "name": "boom"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
        assert_eq!(err.message, "An internal error occurred");
    }
}
