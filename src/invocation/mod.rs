//! One notification run: validate, exchange a token, send, report.
//!
//! Every failure is recovered here and turned into an
//! [`InvocationReport`]; nothing propagates to the caller as an error.

pub mod params;
pub mod report;

use tracing::{error, info, warn};

use crate::credentials::Credentials;
use crate::gateway::{
    AuthError, Endpoints, HttpTransport, MessageSender, Recipients, SendError, SendReceipt,
    TextMessage, TokenExchanger,
};
use crate::redactor::Redactor;

pub use params::{NotifyParams, ParamsError, ValidParams};
pub use report::InvocationReport;

/// Delivery failure, by stage.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Token exchange failed; no send was attempted.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The send itself failed.
    #[error(transparent)]
    Send(#[from] SendError),
}

impl NotifyError {
    /// Whether the detail is recipient ids or platform `errmsg` text rather
    /// than a raw body or transport error.
    pub fn echoes_gateway_text(&self) -> bool {
        matches!(
            self,
            Self::Send(SendError::InvalidUser(_) | SendError::Api { .. })
        )
    }
}

/// Runs invocations against one gateway.
pub struct Invocation<'a> {
    transport: &'a dyn HttpTransport,
    endpoints: &'a Endpoints,
}

impl<'a> Invocation<'a> {
    /// Create an invocation runner.
    pub fn new(transport: &'a dyn HttpTransport, endpoints: &'a Endpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Run one invocation to completion.
    ///
    /// Check mode returns right after validation, before any network call.
    pub async fn run(&self, params: NotifyParams) -> InvocationReport {
        let attempted = params.msg.clone().filter(|m| !m.is_empty());
        let valid = match params.validate() {
            Ok(valid) => valid,
            Err(err) => {
                warn!(error = %err, "rejecting invocation");
                return InvocationReport::failure(attempted, err.to_string());
            }
        };

        if valid.check_mode {
            info!("check mode, skipping delivery");
            return InvocationReport::unchanged();
        }

        let recipients = Recipients::resolve(valid.touser, valid.toparty, valid.totag);
        let message = TextMessage::new(valid.agent_id, valid.msg, recipients);
        let mut redactor = Redactor::new(valid.credentials.known_secrets());

        match self
            .deliver(&valid.credentials, &message, &mut redactor)
            .await
        {
            Ok(_) => InvocationReport::sent(&message),
            Err(err) => {
                let detail = if err.echoes_gateway_text() {
                    redactor.redact_patterns(&err.to_string())
                } else {
                    redactor.redact(&err.to_string())
                };
                error!(error = %detail, "unable to send message");
                InvocationReport::failure(Some(message.body().to_owned()), detail)
            }
        }
    }

    /// Exchange a token, then send `message` with it.
    ///
    /// The token is registered with `redactor` as soon as it exists.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Auth`] if the exchange fails, in which case no
    /// send is attempted, or [`NotifyError::Send`] if the send fails.
    pub async fn deliver(
        &self,
        credentials: &Credentials,
        message: &TextMessage,
        redactor: &mut Redactor,
    ) -> Result<SendReceipt, NotifyError> {
        let token = TokenExchanger::new(self.transport, self.endpoints)
            .exchange(credentials)
            .await?;
        redactor.add_secret(token.as_str());

        let receipt = MessageSender::new(self.transport, self.endpoints)
            .send(&token, message)
            .await?;
        Ok(receipt)
    }
}
