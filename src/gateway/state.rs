use std::sync::Arc;
use std::time::Duration;

use super::router::ActionRouter;
use crate::auth::TokenVerifier;
use crate::backend::{BackendError, RestBackend};
use crate::config::AppConfig;
use crate::rate_limit::SlidingWindowLimiter;

/// Gateway shared state
pub struct AppState {
    /// Rate limiter + validators + backend
    pub router: ActionRouter,
    /// Bearer token → caller identity
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(router: ActionRouter, verifier: TokenVerifier) -> Self {
        Self { router, verifier }
    }

    /// Production wiring: in-memory limiter + REST backend.
    pub fn from_config(config: &AppConfig) -> Result<Self, BackendError> {
        let limiter = Arc::new(SlidingWindowLimiter::new(Duration::from_secs(
            config.rate_limit.cleanup_interval_secs,
        )));
        let backend = Arc::new(RestBackend::new(
            config.backend.url.as_str(),
            config.backend.api_key.as_str(),
            Duration::from_secs(config.backend.timeout_secs),
        )?);
        let router = ActionRouter::new(limiter, config.action_limits(), backend);
        let verifier = TokenVerifier::from_secret(config.auth.jwt_secret.as_deref());
        Ok(Self::new(router, verifier))
    }
}
