use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use validator::{Validate, ValidationError};

use crate::actions::{Action, ActionLimits};
use crate::rate_limit::RateLimitConfig;

/// Overrides `auth.jwt_secret`
pub const ENV_JWT_SECRET: &str = "GATEWAY_JWT_SECRET";
/// Overrides `backend.api_key`
pub const ENV_BACKEND_API_KEY: &str = "BACKEND_API_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Per-request access lines (target `ACCESS`)
    #[serde(default = "default_true")]
    pub enable_access_log: bool,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitSettings,
    #[validate(nested)]
    pub backend: BackendConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret; when absent tokens are trusted on their claims
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct RateLimitSettings {
    #[serde(default = "default_cleanup_interval_secs")]
    #[validate(range(min = 1))]
    pub cleanup_interval_secs: u64,
    /// Per-action overrides; unlisted actions keep their defaults
    #[serde(default)]
    #[validate(custom(function = "validate_action_limits"))]
    pub actions: HashMap<Action, RateLimitConfig>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval_secs(),
            actions: HashMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Validate)]
pub struct BackendConfig {
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_backend_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_backend_timeout_secs() -> u64 {
    10
}

fn validate_action_limits(
    limits: &HashMap<Action, RateLimitConfig>,
) -> Result<(), ValidationError> {
    if limits.values().any(|limit| limit.validate().is_err()) {
        return Err(ValidationError::new("rate_limit")
            .with_message("max_requests must be >= 1 and window_seconds within 1..=31536000".into()));
    }
    Ok(())
}

impl AppConfig {
    /// Load `config/{env}.yaml`, apply env overrides, validate.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets usually come from the environment, not the file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = Some(secret);
        }
        if let Some(key) = lookup(ENV_BACKEND_API_KEY).filter(|s| !s.is_empty()) {
            self.backend.api_key = key;
        }
    }

    pub fn action_limits(&self) -> ActionLimits {
        self.rate_limit
            .actions
            .iter()
            .fold(ActionLimits::default(), |limits, (action, config)| {
                limits.with(*action, *config)
            })
    }
}
