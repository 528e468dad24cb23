use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{Backend, BackendCall, BackendError};

/// Backend reached over its REST RPC endpoint:
/// `POST {base_url}/rest/v1/rpc/{function}`.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Error body returned by the RPC endpoint
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

impl RestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn call(&self, auth_token: &str, call: BackendCall) -> Result<Value, BackendError> {
        let url = self.rpc_url(call.function_name());
        debug!(function = call.function_name(), "[BACKEND] rpc call");

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(auth_token)
            .json(&call.params())
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to read response: {}", e)))?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| BackendError::Transport(format!("Failed to parse response: {}", e)));
        }

        match serde_json::from_slice::<RpcErrorBody>(&bytes) {
            Ok(body) => Err(BackendError::Rpc {
                message: body
                    .message
                    .or(body.error)
                    .unwrap_or_else(|| format!("Backend returned HTTP {}", status.as_u16())),
                code: body.code,
            }),
            Err(_) => Err(BackendError::Transport(format!(
                "Backend returned HTTP {}",
                status.as_u16()
            ))),
        }
    }
}
