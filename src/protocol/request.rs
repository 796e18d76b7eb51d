//! Verification request types.

use std::fmt;

use url::Url;

use crate::error::{ProtocolErrorKind, ValidateError, ValidateResult};

/// Path of the WSAPI 2.0 verification endpoint.
pub const VERIFY_PATH: &str = "/wsapi/2.0/verify";

/// HTTP verb of a request. The protocol only uses GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verb {
    #[default]
    Get,
}

/// URL scheme used to reach the validation hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl Scheme {
    pub fn from_secure(secure: bool) -> Self {
        if secure {
            Self::Https
        } else {
            Self::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to one validation host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    url: String,
    host: String,
    verb: Verb,
}

impl ValidationRequest {
    /// Create a request for an absolute http(s) URL.
    pub fn new(url: impl Into<String>) -> ValidateResult<Self> {
        let url = url.into();
        let invalid = || ValidateError::Protocol {
            kind: ProtocolErrorKind::InvalidUrl { url: url.clone() },
        };

        let parsed = Url::parse(&url).map_err(|_| invalid())?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid());
        }
        let host = parsed.host_str().ok_or_else(invalid)?.to_string();

        Ok(Self {
            url,
            host,
            verb: Verb::Get,
        })
    }

    /// Build a signed verification request for `host`.
    ///
    /// `query` is the canonical parameter string and `signature` the
    /// already URL-safe signature over it.
    pub fn verify(
        scheme: Scheme,
        host: &str,
        query: &str,
        signature: &str,
    ) -> ValidateResult<Self> {
        Self::new(format!(
            "{}://{}{}?{}&h={}",
            scheme, host, VERIFY_PATH, query, signature
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }
}
