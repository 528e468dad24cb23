//! HTTP surface of the write-path gateway.
//!
//! | route | method | |
//! |---|---|---|
//! | `/functions/v1/gateway` | POST | entry point |
//! | `/functions/v1/gateway` | OPTIONS | CORS preflight / `ok` |
//! | `/health` | GET | liveness |
//! | `/docs`, `/api-docs/openapi.json` | GET | Swagger UI |

pub mod handlers;
pub mod openapi;
pub mod router;
pub mod state;

use axum::Router;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;

pub use router::ActionRouter;
pub use state::AppState;

pub const GATEWAY_PATH: &str = "/functions/v1/gateway";

/// Browser clients call the gateway cross-origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
        .expose_headers([
            header::RETRY_AFTER,
            HeaderName::from_static(handlers::REQUEST_ID_HEADER),
        ])
}

/// Build the complete application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            GATEWAY_PATH,
            post(handlers::handle_gateway)
                .options(handlers::options_ok)
                .fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // stateless, added after with_state
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(cors_layer())
}

/// Bind and serve until the process is stopped.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    if !state.verifier.verifies_signature() {
        tracing::warn!(
            "[GATEWAY] token signatures are NOT verified; caller identity is read from claims only"
        );
    }

    info!("[GATEWAY] listening on http://{}", addr);
    info!("[GATEWAY] entry point: POST {}", GATEWAY_PATH);
    info!("[GATEWAY] API docs: http://{}/docs", addr);

    axum::serve(listener, build_router(state)).await
}
