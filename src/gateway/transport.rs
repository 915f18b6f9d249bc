//! HTTP transport seam for the gateway clients.
//!
//! The clients only need "GET a URL" and "POST JSON to a URL", each giving
//! back a status code and a raw body. [`ReqwestTransport`] is the production
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use crate::config::GatewayConfig;

/// Transport-level failure: connect, TLS, or reading the body.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs carry the corp secret or the access token.
        let err = err.without_url();
        let mut detail = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(": ");
            detail.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        Self(detail)
    }
}

/// Status code and raw body of a gateway response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpReply {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP client interface used by the gateway clients.
///
/// Implementations must be `Send + Sync` so a single transport can be shared
/// by reference across `.await` points.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response is received.
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError>;

    /// Issue a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response is received.
    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport honouring the configured timeouts.
    pub fn new(config: &GatewayConfig) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().unwrap_or_else(|e| {
            warn!(error = %TransportError::from(e), "failed to build HTTP client with timeouts, using default");
            reqwest::Client::default()
        });
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(&GatewayConfig::default())
    }
}

async fn into_reply(response: reqwest::Response) -> Result<HttpReply, TransportError> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok(HttpReply { status, body })
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        let response = self.client.get(url.clone()).send().await?;
        into_reply(response).await
    }

    async fn post_json(
        &self,
        url: &Url,
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError> {
        let response = self.client.post(url.clone()).json(body).send().await?;
        into_reply(response).await
    }
}
