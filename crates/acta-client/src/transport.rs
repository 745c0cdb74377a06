//! HTTP transport seam
//!
//! The transport sends one request and reports what came back. It does not
//! classify, retry, or follow redirects; [`crate::outcome::classify`] and
//! [`crate::ApiClient`] own those decisions.

use crate::error::ClientError;
use crate::request::Method;
use acta_auth::BearerToken;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::Url;
use std::time::Duration;

/// Fully resolved request handed to a transport
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method
    pub method: Method,
    /// Absolute URL
    pub url: Url,
    /// Bearer credential, sent as `Authorization: Bearer <token>`
    pub bearer: Option<BearerToken>,
    /// JSON body
    pub body: Option<serde_json::Value>,
}

/// Raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// `Location` header, if any
    pub location: Option<String>,
    /// Body text
    pub body: String,
}

impl RawResponse {
    /// Response with a body and no headers of interest
    #[inline]
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            location: None,
            body: body.into(),
        }
    }

    /// With `Location` header
    #[inline]
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Transport-level failure: the request did not complete
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS, TLS)
    #[error("connection failed: {0}")]
    Connect(String),

    /// No response within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection dropped or body unreadable
    #[error("transport error: {0}")]
    Other(String),
}

/// Sends requests
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    ///
    /// # Errors
    /// Returns `TransportError` when no HTTP response was received.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest` transport
///
/// Enforces the request timeout and never follows redirects, so a `302`
/// from the download endpoint reaches the caller with its `Location`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create transport with the given per-request timeout
    ///
    /// # Errors
    /// Returns `ClientError::TransportInit` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("acta-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::TransportInit(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    /// Configured timeout
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_error(&self, error: &reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if error.is_connect() {
            TransportError::Connect(error.to_string())
        } else {
            TransportError::Other(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(request.url),
            Method::Post => self.client.post(request.url),
        };
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(&e))?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| self.map_error(&e))?;

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }
}
