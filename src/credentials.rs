//! Application identity for the gateway and its optional `.env` source.
//!
//! The corp id and secret are the only long-lived secrets this tool handles.
//! Neither ever reaches a log line: both types here print `[REDACTED]` from
//! their `Debug` impls.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

/// Env-file key holding the corp id.
pub const CORP_ID_KEY: &str = "WECHAT_CORP_ID";

/// Env-file key holding the application secret.
pub const SECRET_KEY: &str = "WECHAT_SECRET";

/// Corp id and application secret issued by the platform.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    corp_id: String,
    secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("corp_id", &"[REDACTED]")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a corp id and secret.
    pub fn new(corp_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            corp_id: corp_id.into(),
            secret: secret.into(),
        }
    }

    /// The corp id.
    pub fn corp_id(&self) -> &str {
        &self.corp_id
    }

    /// The application secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns all non-empty credential values for redaction purposes.
    pub fn known_secrets(&self) -> Vec<String> {
        [&self.corp_id, &self.secret]
            .into_iter()
            .filter(|value| !value.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// Key-value pairs read from a dotenv file.
#[derive(Clone, Default)]
pub struct EnvFile {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for EnvFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvFile")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl EnvFile {
    /// Build from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a non-empty value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// The corp id stored under [`CORP_ID_KEY`].
    pub fn corp_id(&self) -> Option<&str> {
        self.get(CORP_ID_KEY)
    }

    /// The secret stored under [`SECRET_KEY`].
    pub fn secret(&self) -> Option<&str> {
        self.get(SECRET_KEY)
    }
}

/// Load a dotenv file holding gateway credentials.
///
/// The file is parsed without touching the process environment.
///
/// # Errors
///
/// Returns an error if the file does not exist, is readable by group or
/// others, or fails to parse.
pub fn load_env_file(path: &Path) -> anyhow::Result<EnvFile> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(EnvFile { vars })
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}
