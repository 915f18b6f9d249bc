//! Gateway URL construction.

use url::Url;

use crate::credentials::Credentials;

use super::token::AccessToken;

/// Public WeCom API host.
pub const DEFAULT_BASE_URL: &str = "https://qyapi.weixin.qq.com";

const TOKEN_PATH: [&str; 2] = ["cgi-bin", "gettoken"];
const SEND_PATH: [&str; 3] = ["cgi-bin", "message", "send"];

/// Invalid gateway base URL.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    /// The base URL did not parse.
    #[error("invalid gateway base URL: {0}")]
    Parse(#[from] url::ParseError),
    /// The base URL is not http or https.
    #[error("unsupported gateway URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Builds the token and send URLs against a gateway base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    /// Parse and validate a base URL such as `https://qyapi.weixin.qq.com`.
    ///
    /// A path prefix on the base is kept, so a gateway behind a reverse
    /// proxy at `https://proxy.example/wecom` works too.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] if the URL does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, EndpointError> {
        let base = Url::parse(base_url)?;
        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(EndpointError::UnsupportedScheme(other.to_owned())),
        }
    }

    /// The validated base URL.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET {base}/cgi-bin/gettoken?corpid=..&corpsecret=..`
    pub fn token_url(&self, credentials: &Credentials) -> Url {
        let mut url = self.endpoint(&TOKEN_PATH);
        url.query_pairs_mut()
            .append_pair("corpid", credentials.corp_id())
            .append_pair("corpsecret", credentials.secret());
        url
    }

    /// `POST {base}/cgi-bin/message/send?access_token=..`
    pub fn send_url(&self, token: &AccessToken) -> Url {
        let mut url = self.endpoint(&SEND_PATH);
        url.query_pairs_mut()
            .append_pair("access_token", token.as_str());
        url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        // http(s) URLs always have a path, so this only fails for
        // cannot-be-a-base URLs, which `new` rejects.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
