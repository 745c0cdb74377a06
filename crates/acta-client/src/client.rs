//! Resilient API client
//!
//! One call makes at most two HTTP attempts. The second attempt happens only
//! after a network failure and is preceded by a forced token refresh: an
//! expired token combined with a CORS preflight surfaces as a transport error
//! rather than a clean 401.

use crate::error::ClientError;
use crate::outcome::{classify, ApiOutcome};
use crate::request::{ApiRequest, BaseUrl};
use crate::transport::{HttpRequest, Transport};
use acta_auth::{BearerToken, TokenProvider};
use reqwest::Url;
use std::sync::Arc;

/// Upper bound on HTTP attempts per call
pub const MAX_ATTEMPTS: u32 = 2;

/// Executes [`ApiRequest`]s against the configured base URL
pub struct ApiClient {
    base: BaseUrl,
    transport: Arc<dyn Transport>,
    tokens: Arc<TokenProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create client
    #[must_use]
    pub fn new(base: BaseUrl, transport: Arc<dyn Transport>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            base,
            transport,
            tokens,
        }
    }

    /// Create client from a base URL string
    ///
    /// # Errors
    /// Returns `ClientError::InvalidBaseUrl` if `base` is not a usable URL.
    pub fn from_base_url(
        base: &str,
        transport: Arc<dyn Transport>,
        tokens: Arc<TokenProvider>,
    ) -> Result<Self, ClientError> {
        Ok(Self::new(BaseUrl::parse(base)?, transport, tokens))
    }

    /// Base URL
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &BaseUrl {
        &self.base
    }

    /// Token provider
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Execute `request`
    ///
    /// Network failures are retried once after a forced token refresh.
    /// Auth, server and client failures are returned as-is.
    pub async fn call(&self, request: ApiRequest) -> ApiOutcome {
        let url = request.url(&self.base);

        let bearer = if request.requires_auth() {
            self.tokens.token(false).await
        } else {
            None
        };

        let first = self.attempt(&request, url.clone(), bearer, 1).await;
        if !first.is_network_failure() {
            return first;
        }

        tracing::warn!(
            method = %request.method(),
            path = %request.path(),
            outcome = %first,
            "network failure, refreshing session and retrying once"
        );

        // Forced for unauthenticated requests too; a failed refresh clears the store.
        let refreshed = self.tokens.token(true).await;
        let bearer = if request.requires_auth() {
            refreshed
        } else {
            None
        };

        let second = self.attempt(&request, url, bearer, MAX_ATTEMPTS).await;
        if second.is_network_failure() {
            tracing::error!(path = %request.path(), "retry failed, giving up");
        }
        second
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        url: Url,
        bearer: Option<BearerToken>,
        attempt: u32,
    ) -> ApiOutcome {
        tracing::debug!(
            method = %request.method(),
            path = %request.path(),
            attempt,
            authenticated = bearer.is_some(),
            "sending request"
        );

        let http = HttpRequest {
            method: request.method(),
            url,
            bearer,
            body: request.body().cloned(),
        };
        let outcome = classify(self.transport.send(http).await);

        tracing::debug!(
            path = %request.path(),
            attempt,
            kind = %outcome.kind(),
            status = ?outcome.status(),
            "request finished"
        );
        outcome
    }
}
