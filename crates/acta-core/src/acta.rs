//! Wiring from configuration to a ready client

use crate::config::ActaConfig;
use crate::error::ActaError;
use crate::telemetry::{TelemetrySink, TracingSink};
use crate::workflow::WorkflowOrchestrator;
use acta_auth::{
    FileSlot, IdentityProvider, RefreshTokenIdentity, SessionStore, StaticIdentity, TokenProvider,
};
use acta_client::{ActaApi, ApiClient, ClientError, ReqwestTransport, Transport};
use std::sync::Arc;

/// Session store, token provider, API and orchestrator built from one config
#[derive(Debug)]
pub struct Acta {
    config: ActaConfig,
    tokens: Arc<TokenProvider>,
    api: ActaApi,
    orchestrator: WorkflowOrchestrator,
}

impl Acta {
    /// Build production components from `config`
    ///
    /// Restores the persisted session when `session_dir` is set. Identity is
    /// the OAuth refresh grant when configured, else the static token, else
    /// signed out.
    ///
    /// # Errors
    /// Returns `ActaError` for invalid configuration, an unreadable session
    /// slot, or an HTTP client that cannot be built.
    pub fn from_config(config: ActaConfig) -> Result<Self, ActaError> {
        config.validate()?;

        let store = match &config.session_dir {
            Some(dir) => SessionStore::load(FileSlot::new(dir))?,
            None => SessionStore::in_memory(),
        };

        let identity: Arc<dyn IdentityProvider> = match (&config.identity, &config.static_token) {
            (Some(oauth), _) => {
                let mut provider = RefreshTokenIdentity::new(
                    oauth.token_url.as_str(),
                    oauth.client_id.as_str(),
                    oauth.refresh_token.as_str(),
                )
                .with_timeout(config.request_timeout())
                .map_err(|e| ClientError::TransportInit(e.to_string()))?;
                if let Some(email) = &config.pm_email {
                    provider = provider.with_login_id(email.as_str());
                }
                Arc::new(provider)
            }
            (None, Some(token)) => {
                let mut provider = StaticIdentity::new(token.as_str());
                if let Some(email) = &config.pm_email {
                    provider = provider.with_login_id(email.as_str());
                }
                Arc::new(provider)
            }
            (None, None) => Arc::new(StaticIdentity::signed_out()),
        };

        let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
        Self::with_parts(config, Arc::new(store), identity, transport, Arc::new(TracingSink::new()))
    }

    /// Build from explicit components
    ///
    /// # Errors
    /// Returns `ActaError::Config` if the base URL is invalid.
    pub fn with_parts(
        config: ActaConfig,
        store: Arc<SessionStore>,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn Transport>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Result<Self, ActaError> {
        let base = config.base_url()?;
        let tokens = Arc::new(TokenProvider::new(store, identity).with_skip_auth(config.skip_auth));
        if config.skip_auth {
            tracing::warn!("skip-auth mode enabled, using synthetic credentials");
        }

        let client = ApiClient::new(base, transport, Arc::clone(&tokens));
        let api = ActaApi::new(Arc::new(client));
        let orchestrator = WorkflowOrchestrator::new(api.clone(), telemetry);

        tracing::info!(base_url = %config.api_base_url, "acta client ready");
        Ok(Self {
            config,
            tokens,
            api,
            orchestrator,
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ActaConfig {
        &self.config
    }

    /// Token provider
    #[inline]
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    /// Typed API
    #[inline]
    #[must_use]
    pub fn api(&self) -> &ActaApi {
        &self.api
    }

    /// Workflow orchestrator
    #[inline]
    #[must_use]
    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }

    /// Project manager e-mail: configured value, else the signed-in identity
    pub async fn pm_email(&self) -> Option<String> {
        match &self.config.pm_email {
            Some(email) => Some(email.clone()),
            None => self.tokens.login_id().await,
        }
    }

    /// Forget the current session
    pub fn sign_out(&self) {
        self.tokens.sign_out();
    }
}
