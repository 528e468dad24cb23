//! Caller authentication for gateway requests.
//!
//! The caller identity is the `sub` claim of the bearer token. By default
//! the claim is read without verifying the signature ([`extract_identity`]);
//! the raw token is forwarded to the backend, which authorizes the write as
//! that caller. Configuring an HS256 secret switches [`TokenVerifier`] to
//! full signature + expiry verification.

pub mod claims;
pub mod verifier;

use axum::http::{HeaderMap, header};

use crate::result::GatewayError;

pub use claims::{Claims, extract_identity};
pub use verifier::TokenVerifier;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid authorization header")]
    InvalidScheme,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token verification failed: {0}")]
    VerificationFailed(String),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        GatewayError::unauthorized(err.to_string())
    }
}

/// Authenticated caller of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCaller {
    /// Rate-limit identity (token subject)
    pub user_id: String,
    /// Raw bearer token, forwarded to the backend
    pub token: String,
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; the token must be non-empty.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidScheme);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}

/// Bearer header → [`AuthenticatedCaller`]
pub fn authenticate(
    headers: &HeaderMap,
    verifier: &TokenVerifier,
) -> Result<AuthenticatedCaller, AuthError> {
    let token = bearer_token(headers)?;
    let user_id = verifier.identify(token)?;
    Ok(AuthenticatedCaller {
        user_id,
        token: token.to_string(),
    })
}
