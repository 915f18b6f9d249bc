//! Access token exchange (`GET /cgi-bin/gettoken`).

use serde::Deserialize;
use tracing::{debug, info};

use crate::credentials::Credentials;

use super::endpoints::Endpoints;
use super::transport::{HttpReply, HttpTransport, TransportError};

/// Short-lived bearer token returned by the gateway.
///
/// Expiry is not tracked: every invocation exchanges for a fresh token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

impl AccessToken {
    /// Wrap a raw token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Token exchange failed.
///
/// Bad credentials and malformed responses are deliberately not told
/// apart; both carry the raw body for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The gateway could not be reached.
    #[error("token request failed: {0}")]
    Transport(#[from] TransportError),
    /// The gateway answered without a usable token.
    #[error("invalid corpid or corpsecret, api result: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Extract the access token from a gettoken reply.
///
/// # Errors
///
/// Returns [`AuthError::Rejected`] for a non-2xx status, a body that is not
/// JSON, or a missing, non-string, or empty `access_token` field.
pub fn parse_token_response(reply: &HttpReply) -> Result<AccessToken, AuthError> {
    let rejected = || AuthError::Rejected {
        status: reply.status,
        body: reply.body.clone(),
    };

    if !reply.is_success() {
        return Err(rejected());
    }

    serde_json::from_str::<TokenResponse>(&reply.body)
        .ok()
        .and_then(|parsed| parsed.access_token)
        .filter(|token| !token.is_empty())
        .map(AccessToken)
        .ok_or_else(rejected)
}

/// Exchanges application credentials for an [`AccessToken`].
pub struct TokenExchanger<'a> {
    transport: &'a dyn HttpTransport,
    endpoints: &'a Endpoints,
}

impl<'a> TokenExchanger<'a> {
    /// Create an exchanger over a transport and endpoint set.
    pub fn new(transport: &'a dyn HttpTransport, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Perform one gettoken round trip. No retries.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] if the gateway is unreachable or does not hand
    /// back a usable token.
    pub async fn exchange(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let url = self.endpoints.token_url(credentials);
        debug!(host = ?self.endpoints.base().host_str(), "requesting access token");

        let reply = self.transport.get(&url).await?;
        let token = parse_token_response(&reply)?;

        info!("access token acquired");
        Ok(token)
    }
}
