//! Identity provider seam
//!
//! The hosted identity provider is an external collaborator. This module
//! defines the contract the token provider consumes and two implementations:
//! a fixed token (CLI/tests) and an OAuth2 refresh-token grant against a
//! token endpoint such as a Cognito hosted domain.

use crate::error::IdentityError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;

/// Timeout applied to token endpoint requests unless a client is supplied
pub const DEFAULT_IDENTITY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Session as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySession {
    /// Bearer token value
    pub token: String,
    /// Token expiry, if known
    pub expires_at: Option<DateTime<Utc>>,
    /// Signed-in user identifier (usually an e-mail address)
    pub login_id: Option<String>,
}

impl IdentitySession {
    /// Session with unknown expiry
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
            login_id: None,
        }
    }

    /// With expiry
    #[inline]
    #[must_use]
    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// With login id
    #[inline]
    #[must_use]
    pub fn with_login_id(mut self, login_id: impl Into<String>) -> Self {
        self.login_id = Some(login_id.into());
        self
    }
}

/// Issues sessions
///
/// `force_refresh = true` must bypass any cache the provider keeps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, refreshed if `force_refresh` is set
    ///
    /// # Errors
    /// Returns `IdentityError` when no session can be produced.
    async fn current_session(&self, force_refresh: bool) -> Result<IdentitySession, IdentityError>;
}

/// Fixed token, no refresh capability
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    session: Option<IdentitySession>,
}

impl StaticIdentity {
    /// Provider that always returns `token`
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            session: Some(IdentitySession::new(token)),
        }
    }

    /// Provider with no signed-in user
    #[inline]
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// With login id
    #[inline]
    #[must_use]
    pub fn with_login_id(mut self, login_id: impl Into<String>) -> Self {
        self.session = self.session.map(|s| s.with_login_id(login_id));
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_session(&self, _force_refresh: bool) -> Result<IdentitySession, IdentityError> {
        self.session.clone().ok_or(IdentityError::NoActiveSession)
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Token endpoint error body
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 `refresh_token` grant
///
/// Prefers the `id_token` of the response (the API authorizer validates ID
/// tokens), falling back to `access_token`. The last issued session is cached
/// until it expires or a refresh is forced.
#[derive(Debug)]
pub struct RefreshTokenIdentity {
    token_url: String,
    client_id: String,
    refresh_token: String,
    login_id: Option<String>,
    http_client: reqwest::Client,
    cached: Mutex<Option<IdentitySession>>,
}

impl RefreshTokenIdentity {
    /// Create provider for `token_url`
    ///
    /// Token requests are bounded by [`DEFAULT_IDENTITY_TIMEOUT`].
    #[must_use]
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            refresh_token: refresh_token.into(),
            login_id: None,
            http_client: timed_client(DEFAULT_IDENTITY_TIMEOUT)
                .unwrap_or_else(|_| reqwest::Client::new()),
            cached: Mutex::new(None),
        }
    }

    /// With login id reported alongside issued sessions
    #[inline]
    #[must_use]
    pub fn with_login_id(mut self, login_id: impl Into<String>) -> Self {
        self.login_id = Some(login_id.into());
        self
    }

    /// With token requests bounded by `timeout`
    ///
    /// # Errors
    /// Returns the `reqwest` error if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        self.http_client = timed_client(timeout)?;
        Ok(self)
    }

    /// With a preconfigured HTTP client (timeouts, proxies)
    #[inline]
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    fn cached_session(&self) -> Option<IdentitySession> {
        let now = Utc::now();
        self.cached
            .lock()
            .clone()
            .filter(|s| s.expires_at.map_or(true, |exp| exp > now))
    }

    async fn refresh(&self) -> Result<IdentitySession, IdentityError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];

        tracing::debug!(token_url = %self.token_url, "requesting session refresh");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| status.to_string());
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| IdentityError::Malformed(e.to_string()))?;
        let token = parsed
            .id_token
            .or(parsed.access_token)
            .ok_or_else(|| IdentityError::Malformed("response carries no token".to_string()))?;

        let mut session = IdentitySession::new(token);
        if let Some(secs) = parsed.expires_in {
            session = session.expiring_at(expiry_after(Utc::now(), secs)?);
        }
        if let Some(login_id) = &self.login_id {
            session = session.with_login_id(login_id.clone());
        }
        Ok(session)
    }
}

fn timed_client(timeout: std::time::Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// `now + expires_in`, rejecting negative or unrepresentable lifetimes
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, IdentityError> {
    if expires_in < 0 {
        return Err(IdentityError::Malformed(format!(
            "negative expires_in: {expires_in}"
        )));
    }
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| IdentityError::Malformed(format!("expires_in out of range: {expires_in}")))
}

#[async_trait]
impl IdentityProvider for RefreshTokenIdentity {
    async fn current_session(&self, force_refresh: bool) -> Result<IdentitySession, IdentityError> {
        if !force_refresh {
            if let Some(session) = self.cached_session() {
                return Ok(session);
            }
        }

        let session = self.refresh().await?;
        *self.cached.lock() = Some(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_identity_returns_token() {
        let identity = StaticIdentity::new("abc").with_login_id("pm@example.com");
        let session = identity.current_session(true).await.unwrap();
        assert_eq!(session.token, "abc");
        assert_eq!(session.login_id.as_deref(), Some("pm@example.com"));
    }

    #[tokio::test]
    async fn signed_out_identity_has_no_session() {
        let identity = StaticIdentity::signed_out();
        assert!(matches!(
            identity.current_session(false).await,
            Err(IdentityError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn refresh_identity_reports_unreachable_endpoint() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let identity =
            RefreshTokenIdentity::new(format!("http://{addr}/oauth2/token"), "client", "refresh");
        let result = identity.current_session(false).await;
        assert!(matches!(result, Err(IdentityError::Unreachable(_))));
    }

    /// Accept one connection and answer 200 with `body`
    async fn token_endpoint(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/oauth2/token")
    }

    #[tokio::test]
    async fn refresh_identity_applies_expires_in() {
        let url = token_endpoint(r#"{"id_token":"fresh","expires_in":3600}"#).await;
        let identity = RefreshTokenIdentity::new(url, "client", "refresh");

        let session = identity.current_session(true).await.unwrap();
        assert_eq!(session.token, "fresh");
        let expiry = session.expires_at.unwrap();
        assert!(expiry > Utc::now() + Duration::minutes(59));
    }

    #[tokio::test]
    async fn refresh_identity_rejects_out_of_range_expires_in() {
        let url = token_endpoint(r#"{"id_token":"x","expires_in":9223372036854775807}"#).await;
        let identity = RefreshTokenIdentity::new(url, "client", "refresh");

        let result = identity.current_session(true).await;
        assert!(matches!(result, Err(IdentityError::Malformed(_))));
    }

    #[test]
    fn expiry_after_bounds() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 60).unwrap(), now + Duration::seconds(60));
        assert!(matches!(expiry_after(now, -1), Err(IdentityError::Malformed(_))));
        assert!(matches!(expiry_after(now, i64::MAX), Err(IdentityError::Malformed(_))));
        assert!(matches!(
            expiry_after(now, i64::MAX / 1000),
            Err(IdentityError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn refresh_identity_times_out_on_silent_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            drop(socket);
        });

        let identity =
            RefreshTokenIdentity::new(format!("http://{addr}/oauth2/token"), "client", "refresh")
                .with_timeout(std::time::Duration::from_millis(200))
                .unwrap();
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(3),
            identity.current_session(true),
        )
        .await
        .expect("refresh is bounded by the client timeout");

        assert!(matches!(result, Err(IdentityError::Unreachable(_))));
        server.abort();
    }

    #[test]
    fn token_response_prefers_id_token() {
        let parsed: TokenResponse = serde_json::from_str(
            r#"{"id_token":"id","access_token":"access","expires_in":3600,"token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(parsed.id_token.or(parsed.access_token).as_deref(), Some("id"));
    }
}
