use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{Instrument, info, info_span, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::state::AppState;
use crate::actions::GatewayRequest;
use crate::auth;
use crate::logging::ACCESS_LOG_TARGET;
use crate::rate_limit::Clock;
use crate::result::{GatewayEnvelope, GatewayError, GatewayResult};

/// Response header carrying the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Maximum accepted request body
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Gateway entry point
///
/// Authenticates the bearer token, parses `{action, ...payload}`, then
/// routes: unknown action → rate limit → validation → backend.
///
/// - 200 `{ok: true, data}`
/// - 400 invalid_request | unknown_action | invalid_input | invalid_ean | invalid_ean_checksum | rpc_error
/// - 401 unauthorized
/// - 429 rate_limit_exceeded + `Retry-After`
/// - 500 internal_error
#[utoipa::path(
    post,
    path = "/functions/v1/gateway",
    request_body = GatewayRequest,
    responses(
        (status = 200, description = "Write accepted", body = GatewayEnvelope),
        (status = 400, description = "Invalid request or payload", body = GatewayEnvelope),
        (status = 401, description = "Missing or invalid bearer token", body = GatewayEnvelope),
        (status = 405, description = "Method not allowed", body = GatewayEnvelope),
        (status = 429, description = "Rate limited",
            headers(("Retry-After" = u64, description = "Seconds until retry")),
            body = GatewayEnvelope),
        (status = 500, description = "Internal error", body = GatewayEnvelope)
    ),
    security(("bearer_auth" = [])),
    tag = "Gateway"
)]
pub async fn handle_gateway(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = info_span!("gateway", %request_id);
    let started = Instant::now();

    let result = process(&state, &headers, body).instrument(span.clone()).await;

    let mut response = match result {
        Ok(data) => (StatusCode::OK, Json(GatewayEnvelope::success(data))).into_response(),
        Err(err) => err.into_response(),
    };
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    span.in_scope(|| {
        info!(
            target: ACCESS_LOG_TARGET,
            status = response.status().as_u16(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "POST /functions/v1/gateway"
        );
    });
    response
}

async fn process(state: &AppState, headers: &HeaderMap, body: Body) -> GatewayResult<Value> {
    let caller = auth::authenticate(headers, &state.verifier).map_err(|e| {
        warn!(reason = %e, "[GATEWAY] unauthorized");
        GatewayError::from(e)
    })?;

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| GatewayError::invalid_request("Request body too large or unreadable"))?;
    let request = GatewayRequest::from_slice(&bytes).inspect_err(|e| {
        warn!(user_id = %caller.user_id, reason = %e.message, "[GATEWAY] invalid request");
    })?;

    state.router.dispatch(&caller, request).await
}

/// Any method other than POST/OPTIONS on the gateway path
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        [(header::ALLOW, "POST, OPTIONS")],
        GatewayError::method_not_allowed(),
    )
}

/// Plain OPTIONS (no CORS preflight headers)
pub async fn options_ok() -> &'static str {
    "ok"
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    #[schema(example = "0.1.0")]
    pub version: &'static str,
    /// Git revision the binary was built from
    #[schema(example = "3f2a9c1")]
    pub build: &'static str,
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
}

/// Liveness probe. Reports build info; checks no dependencies.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service alive", body = HealthResponse, content_type = "application/json")
    ),
    tag = "System"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        build: env!("GIT_HASH"),
        timestamp_ms: crate::rate_limit::SystemClock.now_ms(),
    })
}
