//! Request descriptors
//!
//! An [`ApiRequest`] names a resource relative to the API base URL. It is
//! built per call, never mutated after construction, and consumed by
//! [`crate::ApiClient::call`].

use crate::error::ClientError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Validated API base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(Url);

impl BaseUrl {
    /// Parse an `http`/`https` base URL such as
    /// `https://api.example.com/prod`
    ///
    /// # Errors
    /// Returns `ClientError::InvalidBaseUrl` for unparsable URLs, non-HTTP
    /// schemes, or URLs that cannot carry a path.
    pub fn parse(input: &str) -> Result<Self, ClientError> {
        let invalid = |reason: &str| ClientError::InvalidBaseUrl {
            url: input.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(input.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("url cannot be a base"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("base url must not carry a query or fragment"));
        }
        Ok(Self(url))
    }

    /// Underlying URL
    #[inline]
    #[must_use]
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// One API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    requires_auth: bool,
}

impl ApiRequest {
    fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            requires_auth: true,
        }
    }

    /// Authenticated GET of the given path segments
    ///
    /// Segments are percent-encoded individually, so ids and e-mail
    /// addresses can be passed as-is.
    #[must_use]
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Get, segments)
    }

    /// Authenticated POST of the given path segments
    #[must_use]
    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Post, segments)
    }

    /// Add a query parameter
    #[inline]
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set JSON body
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send without credentials
    #[inline]
    #[must_use]
    pub fn without_auth(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    /// HTTP method
    #[inline]
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// JSON body
    #[inline]
    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// Whether a bearer token should be attached
    #[inline]
    #[must_use]
    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    /// Path relative to the base URL, unencoded, for logs
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Absolute URL under `base`
    #[must_use]
    pub fn url(&self, base: &BaseUrl) -> Url {
        let mut url = base.as_url().clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(self.segments.iter());
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        url
    }
}
