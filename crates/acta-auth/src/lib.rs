//! Acta Auth
//!
//! Bearer token management for the Acta API.
//!
//! # Overview
//!
//! - **SessionStore**: single source of truth for the current session, backed
//!   by a durable [`TokenSlot`]
//! - **IdentityProvider**: the external collaborator that issues sessions
//! - **TokenProvider**: returns a usable bearer token, refreshing through the
//!   identity provider when the cache is empty, expired, or a refresh is forced
//!
//! # Example
//!
//! ```rust
//! use acta_auth::{SessionStore, StaticIdentity, TokenProvider};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = Arc::new(SessionStore::in_memory());
//! let identity = Arc::new(StaticIdentity::new("jwt-token"));
//! let tokens = TokenProvider::new(store, identity);
//!
//! let token = tokens.token(false).await;
//! assert_eq!(token.map(|t| t.as_str().to_string()), Some("jwt-token".to_string()));
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod identity;
pub mod provider;
pub mod session;
pub mod slot;
pub mod store;

// Re-exports
pub use error::{IdentityError, SessionError};
pub use identity::{
    IdentityProvider, IdentitySession, RefreshTokenIdentity, StaticIdentity, DEFAULT_IDENTITY_TIMEOUT,
};
pub use provider::{AuthMode, TokenProvider, SKIP_AUTH_IDENTITY, SKIP_AUTH_TOKEN};
pub use session::{BearerToken, Session, SessionSource};
pub use slot::{FileSlot, MemorySlot, TokenSlot, SESSION_KEY};
pub use store::SessionStore;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for token management
    pub use crate::{
        AuthMode, BearerToken, IdentityProvider, IdentitySession, Session, SessionStore,
        TokenProvider,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
