//! Bearer token claim extraction (no signature check).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Claims the gateway reads from a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (caller id)
    pub exp: usize,  // Expiration time (UTC timestamp)
    #[serde(default)]
    pub iat: Option<usize>,
}

/// Read the `sub` claim from a three-segment token.
///
/// Returns `None` when the token does not have exactly three dot-separated
/// segments, the payload is not base64url JSON, or `sub` is missing, empty or
/// not a string. The signature segment is ignored.
pub fn extract_identity(token: &str) -> Option<String> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    // Tolerate padded payloads
    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("sub") {
        Some(Value::String(sub)) if !sub.is_empty() => Some(sub.clone()),
        _ => None,
    }
}
