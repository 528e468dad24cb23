//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::actions::{
    Action, DeviceType, GatewayRequest, ProductSubmission, SavedSearch, ScanRecord, TrackedEvent,
};
use crate::gateway::handlers::HealthResponse;
use crate::result::{ErrorKind, GatewayEnvelope};

/// Bearer token issued by the auth provider
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .description(Some(
                    "Session token of the calling user. Its `sub` claim is the rate-limit \
                     identity; the token itself is forwarded to the backend.",
                ))
                .build();
            components.add_security_scheme("bearer_auth", SecurityScheme::Http(scheme));
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Product Gateway API",
        version = "1.0.0",
        description = "Write-path gateway: per-user rate limits, payload validation and forwarding \
                       for record-scan, submit-product, track-event and save-search.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::handle_gateway,
        crate::gateway::handlers::health_check,
    ),
    components(
        schemas(
            GatewayRequest,
            GatewayEnvelope,
            ErrorKind,
            Action,
            ScanRecord,
            ProductSubmission,
            TrackedEvent,
            SavedSearch,
            DeviceType,
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Gateway", description = "Authenticated, rate-limited writes"),
        (name = "System", description = "Health checks and build info")
    )
)]
pub struct ApiDoc;
