//! Transport client.
//!
//! The orchestrator only needs raw bytes plus a status code within a bounded
//! time, so transport sits behind the [`Transport`] trait. [`HttpTransport`]
//! is the reqwest implementation; tests substitute scripted ones.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::errors::MarketDataError;
use crate::models::ProviderId;

/// One GET to issue.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub provider: ProviderId,
    pub url: String,
    pub referer: Option<&'static str>,
}

/// Status and undecoded body of a completed request.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches raw payloads. Any status is returned as-is; only connection,
/// timeout and body-read failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, MarketDataError>;
}

/// reqwest-backed transport with a hard timeout.
///
/// The timeout is applied per request, whichever client ended up built.
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&config.accept_language) {
            Ok(value) => {
                headers.insert(header::ACCEPT_LANGUAGE, value);
            }
            Err(e) => warn!("Ignoring invalid Accept-Language header: {}", e),
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            timeout: config.timeout,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, MarketDataError> {
        debug!("{} GET {}", request.provider, request.url);

        let mut builder = self.client.get(&request.url).timeout(self.timeout);
        if let Some(referer) = request.referer {
            builder = builder.header(header::REFERER, referer);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: request.provider.to_string(),
                }
            } else {
                MarketDataError::Transport {
                    provider: request.provider.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    provider: request.provider.to_string(),
                }
            } else {
                MarketDataError::Transport {
                    provider: request.provider.to_string(),
                    message: format!("Failed to read body: {}", e),
                }
            }
        })?;

        debug!("{} answered {} with {} bytes", request.provider, status, body.len());
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}
