//! Configuration loading.
//!
//! Loads settings from `./wechat-notify.toml` (or `$WECHAT_NOTIFY_CONFIG`, or
//! an explicit path). Environment variables override file values; file values
//! override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::gateway::endpoints::DEFAULT_BASE_URL;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "WECHAT_NOTIFY_CONFIG";

/// Config file used when nothing else is specified.
pub const DEFAULT_CONFIG_FILE: &str = "wechat-notify.toml";

// ── Top-level config ────────────────────────────────────────────

/// Top-level configuration loaded from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Gateway endpoint and transport settings (`[gateway]`).
    pub gateway: GatewayConfig,
    /// Logging settings (`[log]`).
    pub log: LogConfig,
}

impl NotifyConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// `explicit` wins over `$WECHAT_NOTIFY_CONFIG`, which wins over
    /// `./wechat-notify.toml`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = Self::config_path_with(explicit, env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only, no env overrides.
    fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::debug!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("invalid config file {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config file {}: {e}",
                path.display()
            )),
        }
    }

    /// Resolve the config file path using a custom env resolver.
    pub fn config_path_with(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Some(p) = env(CONFIG_PATH_ENV) {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function so tests never mutate the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        // Gateway.
        if let Some(v) = env("WECHAT_NOTIFY_BASE_URL") {
            self.gateway.base_url = v;
        }
        if let Some(v) = env("WECHAT_NOTIFY_CONNECT_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.gateway.connect_timeout_secs = Some(n),
                Err(_) => tracing::warn!(
                    var = "WECHAT_NOTIFY_CONNECT_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
        if let Some(v) = env("WECHAT_NOTIFY_REQUEST_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.gateway.request_timeout_secs = Some(n),
                Err(_) => tracing::warn!(
                    var = "WECHAT_NOTIFY_REQUEST_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }

        // Logging.
        if let Some(v) = env("WECHAT_NOTIFY_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = env("WECHAT_NOTIFY_LOG_DIR") {
            self.log.dir = Some(PathBuf::from(v));
        }
    }

    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has wrongly typed fields.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: NotifyConfig =
            toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }
}

// ── Gateway config ──────────────────────────────────────────────

/// Gateway endpoint and transport settings (`[gateway]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Scheme and host of the gateway API.
    pub base_url: String,
    /// TCP connect timeout. Unset means the transport default.
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout. Unset means no timeout.
    pub request_timeout_secs: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

// ── Log config ──────────────────────────────────────────────────

/// Logging settings (`[log]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily-rotated JSON logs. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}
