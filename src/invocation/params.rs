//! Invocation parameters and their validation.
//!
//! Parameters arrive from up to three places, merged in this order:
//! an Ansible-style JSON args file, CLI flags (which win), and a dotenv
//! credentials file that only fills in a missing corp id or secret.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer};

use crate::credentials::{Credentials, EnvFile};

/// Raw, unvalidated invocation parameters.
///
/// Field names on the wire follow the Ansible module: `corpid`, `secret`,
/// `agentid`, `msg`, `touser`, `toparty`, `totag`, `_ansible_check_mode`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotifyParams {
    /// Corp id.
    #[serde(default, rename = "corpid")]
    pub corp_id: Option<String>,
    /// Application secret.
    #[serde(default)]
    pub secret: Option<String>,
    /// Application agent id. YAML playbooks often pass this as a number.
    #[serde(default, rename = "agentid", deserialize_with = "string_or_number")]
    pub agent_id: Option<String>,
    /// Message body.
    #[serde(default)]
    pub msg: Option<String>,
    /// `|`-joined user ids.
    #[serde(default)]
    pub touser: Option<String>,
    /// `|`-joined department ids.
    #[serde(default)]
    pub toparty: Option<String>,
    /// `|`-joined tag ids.
    #[serde(default)]
    pub totag: Option<String>,
    /// Validate only; make no network calls.
    #[serde(default, rename = "_ansible_check_mode")]
    pub check_mode: bool,
}

impl std::fmt::Debug for NotifyParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("NotifyParams")
            .field("corp_id", &redacted(&self.corp_id))
            .field("secret", &redacted(&self.secret))
            .field("agent_id", &self.agent_id)
            .field("msg", &self.msg)
            .field("touser", &self.touser)
            .field("toparty", &self.toparty)
            .field("totag", &self.totag)
            .field("check_mode", &self.check_mode)
            .finish()
    }
}

impl NotifyParams {
    /// Parse an Ansible JSON args file. Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a JSON object
    /// with the expected field types.
    pub fn from_args_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read args file {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("failed to parse args file {}", path.display()))
    }

    /// Parse args from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has wrongly typed fields.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let params: NotifyParams = serde_json::from_str(json).context("invalid args JSON")?;
        Ok(params)
    }

    /// Overlay `overrides` on top of `self`. Set fields in `overrides` win;
    /// check mode is on if either side asks for it.
    pub fn merge(self, overrides: NotifyParams) -> Self {
        Self {
            corp_id: overrides.corp_id.or(self.corp_id),
            secret: overrides.secret.or(self.secret),
            agent_id: overrides.agent_id.or(self.agent_id),
            msg: overrides.msg.or(self.msg),
            touser: overrides.touser.or(self.touser),
            toparty: overrides.toparty.or(self.toparty),
            totag: overrides.totag.or(self.totag),
            check_mode: overrides.check_mode || self.check_mode,
        }
    }

    /// Take the corp id and secret from `env` where still missing or empty.
    pub fn fill_credentials(&mut self, env: &EnvFile) {
        if is_blank(&self.corp_id) {
            if let Some(v) = env.corp_id() {
                self.corp_id = Some(v.to_owned());
            }
        }
        if is_blank(&self.secret) {
            if let Some(v) = env.secret() {
                self.secret = Some(v.to_owned());
            }
        }
    }

    /// Check required fields and split out the credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ParamsError::Missing`] naming every required field that is
    /// absent or empty, in declaration order.
    pub fn validate(self) -> Result<ValidParams, ParamsError> {
        let mut missing = Vec::new();
        let corp_id = required(self.corp_id, "corpid", &mut missing);
        let secret = required(self.secret, "secret", &mut missing);
        let agent_id = required(self.agent_id, "agentid", &mut missing);
        let msg = required(self.msg, "msg", &mut missing);

        match (corp_id, secret, agent_id, msg) {
            (Some(corp_id), Some(secret), Some(agent_id), Some(msg)) => Ok(ValidParams {
                credentials: Credentials::new(corp_id, secret),
                agent_id,
                msg,
                touser: self.touser,
                toparty: self.toparty,
                totag: self.totag,
                check_mode: self.check_mode,
            }),
            _ => Err(ParamsError::Missing(missing)),
        }
    }
}

/// Parameters that passed validation.
#[derive(Debug, Clone)]
pub struct ValidParams {
    /// Gateway credentials.
    pub credentials: Credentials,
    /// Application agent id.
    pub agent_id: String,
    /// Message body, non-empty.
    pub msg: String,
    /// `|`-joined user ids.
    pub touser: Option<String>,
    /// `|`-joined department ids.
    pub toparty: Option<String>,
    /// `|`-joined tag ids.
    pub totag: Option<String>,
    /// Validate only; make no network calls.
    pub check_mode: bool,
}

/// Parameter validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    /// Required fields are absent or empty.
    #[error("missing required arguments: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

fn required(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    let value = value.filter(|v| !v.is_empty());
    if value.is_none() {
        missing.push(name);
    }
    value
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    }))
}
