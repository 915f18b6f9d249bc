//! Text message delivery (`POST /cgi-bin/message/send`).
//!
//! The gateway answers 200 even when some recipients could not be resolved,
//! naming them in `invaliduser`. That field has to be inspected explicitly;
//! the HTTP status alone says nothing about delivery.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::endpoints::Endpoints;
use super::token::AccessToken;
use super::transport::{HttpReply, HttpTransport, TransportError};

/// Sentinel user target addressing every member visible to the application.
pub const ALL_USERS: &str = "@all";

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Recipient selectors, each a `|`-joined list passed through verbatim.
///
/// Platform limits (1000 users, 100 departments or tags) are left to the
/// gateway to enforce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    touser: Option<String>,
    toparty: Option<String>,
    totag: Option<String>,
}

impl Recipients {
    /// Build recipients from optional selectors.
    ///
    /// Empty strings count as absent. When all three are absent the user
    /// target becomes [`ALL_USERS`].
    pub fn resolve(
        touser: Option<String>,
        toparty: Option<String>,
        totag: Option<String>,
    ) -> Self {
        let touser = non_empty(touser);
        let toparty = non_empty(toparty);
        let totag = non_empty(totag);

        if touser.is_none() && toparty.is_none() && totag.is_none() {
            return Self::everyone();
        }

        Self {
            touser,
            toparty,
            totag,
        }
    }

    /// Every member: `touser = "@all"` and nothing else.
    pub fn everyone() -> Self {
        Self {
            touser: Some(ALL_USERS.to_owned()),
            toparty: None,
            totag: None,
        }
    }

    /// User target, if any.
    pub fn touser(&self) -> Option<&str> {
        self.touser.as_deref()
    }

    /// Department target, if any.
    pub fn toparty(&self) -> Option<&str> {
        self.toparty.as_deref()
    }

    /// Tag target, if any.
    pub fn totag(&self) -> Option<&str> {
        self.totag.as_deref()
    }

    /// Whether the user target is the [`ALL_USERS`] sentinel.
    pub fn is_everyone(&self) -> bool {
        self.touser.as_deref() == Some(ALL_USERS)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Message and wire payload
// ---------------------------------------------------------------------------

/// A text message addressed to a recipient set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    agent_id: String,
    body: String,
    recipients: Recipients,
}

/// `text` object of the send payload.
#[derive(Debug, Serialize)]
pub struct TextContent<'a> {
    /// Message body.
    pub content: &'a str,
}

/// JSON body of `POST /cgi-bin/message/send` for a text message.
#[derive(Debug, Serialize)]
pub struct TextPayload<'a> {
    /// Always `"text"`.
    pub msgtype: &'static str,
    /// Application agent id, as supplied.
    pub agentid: &'a str,
    /// Message content.
    pub text: TextContent<'a>,
    /// Always 0: the message may be forwarded.
    pub safe: u8,
    /// User target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touser: Option<&'a str>,
    /// Department target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toparty: Option<&'a str>,
    /// Tag target. Only ever set together with `toparty`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totag: Option<&'a str>,
}

impl TextMessage {
    /// Build a message.
    pub fn new(agent_id: impl Into<String>, body: impl Into<String>, recipients: Recipients) -> Self {
        Self {
            agent_id: agent_id.into(),
            body: body.into(),
            recipients,
        }
    }

    /// Application agent id.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Message body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Recipient selectors.
    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }

    /// The wire payload for this message.
    ///
    /// `totag` is attached only when a department target is present too; a
    /// tag-only selection therefore sends no recipient fields at all.
    pub fn payload(&self) -> TextPayload<'_> {
        let toparty = self.recipients.toparty();
        TextPayload {
            msgtype: "text",
            agentid: &self.agent_id,
            text: TextContent {
                content: &self.body,
            },
            safe: 0,
            touser: self.recipients.touser(),
            toparty,
            totag: toparty.and(self.recipients.totag()),
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Parsed send response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SendReceipt {
    /// Platform error code, 0 on success.
    #[serde(default)]
    pub errcode: i64,
    /// Platform error message.
    #[serde(default)]
    pub errmsg: String,
    /// `|`-joined users the platform could not resolve.
    #[serde(default)]
    pub invaliduser: Option<String>,
    /// `|`-joined departments the platform could not resolve.
    #[serde(default)]
    pub invalidparty: Option<String>,
    /// `|`-joined tags the platform could not resolve.
    #[serde(default)]
    pub invalidtag: Option<String>,
    /// Gateway-assigned message id.
    #[serde(default)]
    pub msgid: Option<String>,
}

impl SendReceipt {
    /// Unresolved users, if the gateway reported any.
    pub fn invalid_users(&self) -> Option<&str> {
        self.invaliduser.as_deref().filter(|v| !v.is_empty())
    }

    /// Unresolved departments, if the gateway reported any.
    pub fn invalid_parties(&self) -> Option<&str> {
        self.invalidparty.as_deref().filter(|v| !v.is_empty())
    }

    /// Unresolved tags, if the gateway reported any.
    pub fn invalid_tags(&self) -> Option<&str> {
        self.invalidtag.as_deref().filter(|v| !v.is_empty())
    }
}

/// Message delivery failed.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The gateway could not be reached.
    #[error("send request failed: {0}")]
    Transport(#[from] TransportError),
    /// The gateway answered with a non-2xx status.
    #[error("gateway returned non-success status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// The body was not a JSON send response.
    #[error("malformed send response: {body}")]
    MalformedResponse {
        /// Raw response body.
        body: String,
    },
    /// The gateway reported one or more users it could not resolve.
    #[error("invalid user: {0}")]
    InvalidUser(String),
    /// The gateway rejected the call with a non-zero `errcode`.
    #[error("gateway error {errcode}: {errmsg}")]
    Api {
        /// Platform error code.
        errcode: i64,
        /// Platform error message.
        errmsg: String,
    },
    /// The payload could not be serialized.
    #[error("failed to encode message payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Check a send reply and extract the receipt.
///
/// A non-empty `invaliduser` wins over `errcode`, because the gateway sets
/// both when no recipient resolved at all.
///
/// # Errors
///
/// Returns [`SendError`] for a non-2xx status, a non-JSON body, unresolved
/// users, or a non-zero `errcode`.
pub fn parse_send_response(reply: &HttpReply) -> Result<SendReceipt, SendError> {
    if !reply.is_success() {
        return Err(SendError::Status {
            status: reply.status,
            body: reply.body.clone(),
        });
    }

    let receipt: SendReceipt =
        serde_json::from_str(&reply.body).map_err(|_| SendError::MalformedResponse {
            body: reply.body.clone(),
        })?;

    if let Some(users) = receipt.invalid_users() {
        return Err(SendError::InvalidUser(users.to_owned()));
    }

    if receipt.errcode != 0 {
        return Err(SendError::Api {
            errcode: receipt.errcode,
            errmsg: receipt.errmsg,
        });
    }

    Ok(receipt)
}

// ---------------------------------------------------------------------------
// Sender
// ---------------------------------------------------------------------------

/// Posts text messages using an already exchanged token.
pub struct MessageSender<'a> {
    transport: &'a dyn HttpTransport,
    endpoints: &'a Endpoints,
}

impl<'a> MessageSender<'a> {
    /// Create a sender over a transport and endpoint set.
    pub fn new(transport: &'a dyn HttpTransport, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Post one message. No retries and no deduplication: two calls with the
    /// same message are two deliveries.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the gateway is unreachable or reports a
    /// failure, including unresolved users in an otherwise successful reply.
    pub async fn send(
        &self,
        token: &AccessToken,
        message: &TextMessage,
    ) -> Result<SendReceipt, SendError> {
        let recipients = message.recipients();
        if recipients.totag().is_some() && recipients.toparty().is_none() {
            warn!("tag target is only sent alongside a department target, dropping it");
        }

        let payload = serde_json::to_value(message.payload())?;
        let url = self.endpoints.send_url(token);
        debug!(
            agent_id = %message.agent_id(),
            everyone = recipients.is_everyone(),
            body_len = message.body().len(),
            "posting text message"
        );

        let reply = self.transport.post_json(&url, &payload).await?;
        let receipt = parse_send_response(&reply)?;

        if let Some(parties) = receipt.invalid_parties() {
            warn!(invalidparty = %parties, "gateway could not resolve some departments");
        }
        if let Some(tags) = receipt.invalid_tags() {
            warn!(invalidtag = %tags, "gateway could not resolve some tags");
        }

        info!(msgid = ?receipt.msgid, "message accepted by gateway");
        Ok(receipt)
    }
}
