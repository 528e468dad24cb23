//! Gateway actions and their payload validators.
//!
//! | action | limit (default) | backend function |
//! |---|---|---|
//! | `record-scan` | 100 / 24h | `record_scan` |
//! | `submit-product` | 20 / 1h | `submit_product` |
//! | `track-event` | 500 / 1h | `track_event` |
//! | `save-search` | 30 / 1h | `save_search` |

pub mod payloads;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;

use crate::backend::BackendCall;
use crate::rate_limit::RateLimitConfig;
use crate::result::{GatewayError, GatewayResult};

pub use payloads::{DeviceType, ProductSubmission, SavedSearch, ScanRecord, TrackedEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    RecordScan,
    SubmitProduct,
    TrackEvent,
    SaveSearch,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::RecordScan,
        Action::SubmitProduct,
        Action::TrackEvent,
        Action::SaveSearch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordScan => "record-scan",
            Self::SubmitProduct => "submit-product",
            Self::TrackEvent => "track-event",
            Self::SaveSearch => "save-search",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    pub const fn default_limit(self) -> RateLimitConfig {
        match self {
            Self::RecordScan => RateLimitConfig::new(100, 86_400),
            Self::SubmitProduct => RateLimitConfig::new(20, 3_600),
            Self::TrackEvent => RateLimitConfig::new(500, 3_600),
            Self::SaveSearch => RateLimitConfig::new(30, 3_600),
        }
    }

    /// Validate a raw payload into the backend call it forwards to.
    pub fn validate(self, payload: &Map<String, Value>) -> GatewayResult<BackendCall> {
        match self {
            Self::RecordScan => ScanRecord::from_payload(payload).map(BackendCall::RecordScan),
            Self::SubmitProduct => {
                ProductSubmission::from_payload(payload).map(BackendCall::SubmitProduct)
            }
            Self::TrackEvent => TrackedEvent::from_payload(payload).map(BackendCall::TrackEvent),
            Self::SaveSearch => SavedSearch::from_payload(payload).map(BackendCall::SaveSearch),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Per-action limits
// ============================================================================

/// Rate limit per action; actions without an override use their default.
#[derive(Debug, Clone, Default)]
pub struct ActionLimits {
    overrides: HashMap<Action, RateLimitConfig>,
}

impl ActionLimits {
    pub fn with(mut self, action: Action, config: RateLimitConfig) -> Self {
        self.overrides.insert(action, config);
        self
    }

    pub fn get(&self, action: Action) -> RateLimitConfig {
        self.overrides
            .get(&action)
            .copied()
            .unwrap_or_else(|| action.default_limit())
    }
}

// ============================================================================
// Request envelope
// ============================================================================

/// `{ "action": "<name>", ...payload fields }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GatewayRequest {
    #[schema(example = "record-scan")]
    pub action: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub payload: Map<String, Value>,
}

impl GatewayRequest {
    /// Parse a request body. Anything that is not a JSON object with a
    /// non-empty string `action` is `invalid_request`.
    pub fn from_slice(body: &[u8]) -> GatewayResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|_| GatewayError::invalid_request("Invalid JSON body"))?;

        let Value::Object(mut payload) = value else {
            return Err(GatewayError::invalid_request(
                "Request body must be a JSON object",
            ));
        };

        match payload.remove("action") {
            Some(Value::String(action)) if !action.is_empty() => Ok(Self { action, payload }),
            _ => Err(GatewayError::invalid_request("Missing action")),
        }
    }

    pub fn resolve(&self) -> GatewayResult<Action> {
        Action::from_name(&self.action).ok_or_else(|| GatewayError::unknown_action(&self.action))
    }
}
