use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Raw gateway answer: HTTP status and decoded body.
///
/// Non-JSON bodies are kept as a JSON string; an empty body is `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Gateway could not be reached; the client falls back to the backend
    #[error("Gateway unreachable: {0}")]
    Unreachable(String),

    /// Call could not be issued at all
    #[error("Gateway call failed: {0}")]
    Failed(String),
}

/// How the client reaches the gateway entry point.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn invoke(&self, auth_token: &str, body: Value)
    -> Result<TransportResponse, TransportError>;
}

/// Gateway reached over HTTP.
pub struct HttpGatewayTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    client_info: String,
}

impl HttpGatewayTransport {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Failed(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            api_key,
            client_info: format!("product-gateway-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    async fn invoke(
        &self,
        auth_token: &str,
        body: Value,
    ) -> Result<TransportResponse, TransportError> {
        let mut request = self
            .client
            .post(&self.url)
            .bearer_auth(auth_token)
            .header("x-client-info", &self.client_info)
            .json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::Failed(e.to_string())
            } else {
                TransportError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Unreachable(format!("Failed to read response: {}", e)))?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        Ok(TransportResponse { status, body })
    }
}
