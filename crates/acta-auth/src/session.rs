//! Session and bearer token types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque bearer credential
///
/// `Debug` and `Display` never print the token itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header
    #[inline]
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<{} bytes>)", self.0.len())
    }
}

impl fmt::Display for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Where a session came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionSource {
    /// Issued by the hosted identity provider
    IdentityProvider,
    /// Synthesized in skip-auth mode
    SkipAuthStub,
}

/// Current authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: BearerToken,
    expiry: Option<DateTime<Utc>>,
    source: SessionSource,
    login_id: Option<String>,
}

/// Sessions are treated as expired slightly before their real expiry so a
/// token is never sent in its last seconds of validity.
const EXPIRY_SKEW_SECS: i64 = 30;

impl Session {
    /// Create new session
    #[inline]
    #[must_use]
    pub fn new(token: BearerToken, source: SessionSource) -> Self {
        Self {
            token,
            expiry: None,
            source,
            login_id: None,
        }
    }

    /// With known expiry
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// With signed-in user identifier
    #[inline]
    #[must_use]
    pub fn with_login_id(mut self, login_id: impl Into<String>) -> Self {
        self.login_id = Some(login_id.into());
        self
    }

    /// Bearer token
    #[inline]
    #[must_use]
    pub fn token(&self) -> &BearerToken {
        &self.token
    }

    /// Expiry, if the issuer reported one
    #[inline]
    #[must_use]
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Session origin
    #[inline]
    #[must_use]
    pub fn source(&self) -> SessionSource {
        self.source
    }

    /// Signed-in user identifier
    #[inline]
    #[must_use]
    pub fn login_id(&self) -> Option<&str> {
        self.login_id.as_deref()
    }

    /// Unknown expiry never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| now + Duration::seconds(EXPIRY_SKEW_SECS) >= expiry)
    }
}
