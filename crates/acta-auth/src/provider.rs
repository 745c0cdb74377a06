//! Token provider
//!
//! Produces a usable bearer token, refreshing through the identity provider
//! when the cached one is missing, expired, or a refresh is forced. Never
//! fails: absence of a token is the error signal.

use crate::identity::IdentityProvider;
use crate::session::{BearerToken, Session, SessionSource};
use crate::store::SessionStore;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;

/// Token handed out in skip-auth mode
pub const SKIP_AUTH_TOKEN: &str = "mock-auth-token-skip-mode";

/// Identity reported in skip-auth mode
pub const SKIP_AUTH_IDENTITY: &str = "admin@ikusi.com";

/// Authentication mode, fixed at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Sessions come from the identity provider
    #[default]
    Identity,
    /// Fixed synthetic identity; the identity provider is never contacted
    SkipAuth,
}

/// Bearer token source for the API client
pub struct TokenProvider {
    store: Arc<SessionStore>,
    identity: Arc<dyn IdentityProvider>,
    mode: AuthMode,
}

impl fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProvider")
            .field("mode", &self.mode)
            .field("has_session", &!self.store.is_empty())
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// Create provider backed by `store` and `identity`
    #[must_use]
    pub fn new(store: Arc<SessionStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            mode: AuthMode::Identity,
        }
    }

    /// With authentication mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: AuthMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable skip-auth mode
    #[inline]
    #[must_use]
    pub fn with_skip_auth(self, skip_auth: bool) -> Self {
        self.with_mode(if skip_auth {
            AuthMode::SkipAuth
        } else {
            AuthMode::Identity
        })
    }

    /// Active mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Bearer token, or `None` if no session can be obtained
    ///
    /// Without `force_refresh` a cached, unexpired token is returned with no
    /// side effects. Otherwise the identity provider is asked for a session:
    /// success replaces the cached one, failure clears the store.
    pub async fn token(&self, force_refresh: bool) -> Option<BearerToken> {
        self.session(force_refresh).await.map(|s| s.token().clone())
    }

    /// Full session, with the same refresh rules as [`TokenProvider::token`]
    pub async fn session(&self, force_refresh: bool) -> Option<Session> {
        if self.mode == AuthMode::SkipAuth {
            tracing::debug!("skip-auth mode: using synthetic session");
            return Some(skip_auth_session());
        }

        if !force_refresh {
            if let Some(session) = self.store.get() {
                if !session.is_expired(Utc::now()) {
                    return Some(session);
                }
                tracing::debug!("cached session expired, refreshing");
            }
        }

        match self.identity.current_session(force_refresh).await {
            Ok(fresh) => {
                let mut session = Session::new(
                    BearerToken::new(fresh.token),
                    SessionSource::IdentityProvider,
                );
                if let Some(expiry) = fresh.expires_at {
                    session = session.with_expiry(expiry);
                }
                if let Some(login_id) = fresh.login_id {
                    session = session.with_login_id(login_id);
                }

                if let Err(e) = self.store.set(session.clone()) {
                    tracing::warn!(error = %e, "failed to persist refreshed session");
                }
                tracing::info!(force_refresh, "session refreshed");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, force_refresh, "no session from identity provider, clearing cached token");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "failed to clear persisted session");
                }
                None
            }
        }
    }

    /// Signed-in user identifier
    pub async fn login_id(&self) -> Option<String> {
        self.session(false)
            .await
            .and_then(|s| s.login_id().map(str::to_string))
    }

    /// Forget the current session
    pub fn sign_out(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session on sign-out");
        }
        tracing::info!("signed out");
    }
}

fn skip_auth_session() -> Session {
    Session::new(
        BearerToken::new(SKIP_AUTH_TOKEN),
        SessionSource::SkipAuthStub,
    )
    .with_login_id(SKIP_AUTH_IDENTITY)
}
