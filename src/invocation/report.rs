//! JSON result handed back to the task runner on stdout.

use std::process::ExitCode;

use serde::{Deserialize, Serialize};

use crate::gateway::TextMessage;

/// Outcome of one invocation in the shape task runners expect.
///
/// Success echoes the recipients and message. Failure carries the error
/// detail under `wechat_error` and the message that was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationReport {
    /// Whether a message was sent.
    pub changed: bool,
    /// Whether the invocation failed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub failed: bool,
    /// User target that was sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touser: Option<String>,
    /// Department target that was sent to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toparty: Option<String>,
    /// Tag selector as supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totag: Option<String>,
    /// Message body that was sent or attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Failure detail, with secrets redacted.
    #[serde(
        default,
        rename = "wechat_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_detail: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl InvocationReport {
    /// Check mode: nothing sent, nothing to echo.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Message delivered.
    pub fn sent(message: &TextMessage) -> Self {
        let recipients = message.recipients();
        Self {
            changed: true,
            failed: false,
            touser: recipients.touser().map(str::to_owned),
            toparty: recipients.toparty().map(str::to_owned),
            totag: recipients.totag().map(str::to_owned),
            msg: Some(message.body().to_owned()),
            error_detail: None,
        }
    }

    /// Invocation failed with `detail`; `msg` is the attempted body, if known.
    pub fn failure(msg: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            changed: false,
            failed: true,
            msg,
            error_detail: Some(detail.into()),
            ..Self::default()
        }
    }

    /// Process exit status for shell integration.
    pub fn exit_code(&self) -> ExitCode {
        if self.failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    /// Render as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
