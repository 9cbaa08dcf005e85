//! Generic JSON-over-HTTP provider.
//!
//! # Responsibilities
//! - POST request payloads to the inference endpoint
//! - Probe `health_path` on the endpoint origin
//! - Enforce the per-provider timeout on every call

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::ProviderConfig;
use crate::provider::{HealthCheckResult, Provider, ProviderError, ProviderRequest, ProviderResponse};

/// A provider reachable over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    name: String,
    endpoint: Url,
    health_url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpProvider {
    /// Build a provider from its definition.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            ProviderError::Unavailable(format!("invalid endpoint '{}': {}", config.endpoint, e))
        })?;
        let health_url = endpoint.join(&config.health_path).map_err(|e| {
            ProviderError::Unavailable(format!("invalid health path '{}': {}", config.health_path, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("provider-failover"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| ProviderError::Unavailable(format!("invalid api key: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            name: config.name.clone(),
            endpoint,
            health_url,
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn health_url(&self) -> &Url {
        &self.health_url
    }

    fn map_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_request(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-request-id", request.id.to_string())
            .json(&request.payload)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ProviderResponse>()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }

    async fn health_check(&self) -> Result<HealthCheckResult, ProviderError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(|e| self.map_error(e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let status = response.status();
        if status.is_success() {
            Ok(HealthCheckResult {
                is_healthy: true,
                latency_ms: Some(latency_ms),
                error: None,
            })
        } else {
            Ok(HealthCheckResult {
                is_healthy: false,
                latency_ms: Some(latency_ms),
                error: Some(format!("health endpoint returned {}", status)),
            })
        }
    }
}
