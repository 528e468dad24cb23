//! Product Gateway - write-path gateway for the product lookup app
//!
//! Every mutating client operation (scan, product submission, analytics
//! event, saved search) passes through one entry point that authenticates
//! the caller, rate-limits per user and action, validates the payload and
//! forwards it to a backend stored procedure.
//!
//! # Modules
//!
//! - [`validation`] - Field sanitizer and EAN-8/EAN-13 checksum
//! - [`rate_limit`] - Sliding-window limiter behind the `RateLimitStore` trait
//! - [`auth`] - Bearer token parsing and caller identity
//! - [`actions`] - Supported actions and their payload validators
//! - [`backend`] - Downstream backend calls (`Backend` trait, REST client)
//! - [`gateway`] - HTTP entry point, router, CORS, health, OpenAPI
//! - [`client`] - Client wrapper with single-shot backend fallback
//! - [`result`] - Uniform `{ok, data | error}` result contract

// Result contract - shared by everything else
pub mod result;

// Leaf components
pub mod rate_limit;
pub mod validation;

// Request pipeline
pub mod actions;
pub mod auth;
pub mod backend;
pub mod gateway;

// Client side
pub mod client;

// Ambient
pub mod config;
pub mod logging;

// Convenient re-exports at crate root
pub use actions::{Action, GatewayRequest};
pub use backend::{Backend, BackendCall, BackendError, RestBackend};
pub use client::GatewayClient;
pub use config::AppConfig;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitKey, RateLimitStore};
pub use result::{ErrorKind, GatewayEnvelope, GatewayError, GatewayResult};
