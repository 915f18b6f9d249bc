//! Secret redaction chokepoint for error detail leaving the process.

use regex::Regex;

/// Canonical replacement marker for redacted content.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Redacts known secret values and credential-bearing query parameters.
#[derive(Debug, Clone)]
pub struct Redactor {
    exact_secrets: Vec<String>,
    patterns: Vec<Regex>,
}

impl Redactor {
    /// Create a redactor from known secret values.
    pub fn new(exact_secrets: Vec<String>) -> Self {
        let patterns = default_patterns();
        Self {
            exact_secrets,
            patterns,
        }
    }

    /// Register another secret, such as an access token obtained mid-run.
    pub fn add_secret(&mut self, secret: impl Into<String>) {
        self.exact_secrets.push(secret.into());
    }

    /// Redact exact known secrets and known secret patterns.
    pub fn redact(&self, text: &str) -> String {
        let mut sanitized = text.to_owned();
        for secret in &self.exact_secrets {
            if !secret.is_empty() {
                sanitized = sanitized.replace(secret, REDACTION_MARKER);
            }
        }
        self.redact_patterns(&sanitized)
    }

    /// Redact credential-bearing query parameters only.
    ///
    /// For text that echoes recipient ids or gateway messages, where an exact
    /// match on a short corp id would mangle unrelated values.
    pub fn redact_patterns(&self, text: &str) -> String {
        let mut sanitized = text.to_owned();
        for pattern in &self.patterns {
            sanitized = pattern
                .replace_all(&sanitized, format!("${{key}}={REDACTION_MARKER}"))
                .to_string();
        }
        sanitized
    }
}

fn default_patterns() -> Vec<Regex> {
    let patterns = [
        r"(?P<key>access_token)=[^&\s]+",
        r"(?P<key>corpsecret)=[^&\s]+",
        r"(?P<key>corpid)=[^&\s]+",
    ];

    patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
}
