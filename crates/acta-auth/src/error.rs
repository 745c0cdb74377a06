//! Error types for session persistence and identity lookups

use std::path::PathBuf;

/// Session store / slot errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the durable slot failed
    #[error("session slot io error at {path}: {source}")]
    Io {
        /// Slot location
        path: PathBuf,
        /// Underlying io error
        #[source]
        source: std::io::Error,
    },

    /// Slot exists but does not hold a usable token
    #[error("session slot at {0} is corrupt")]
    Corrupt(PathBuf),
}

impl SessionError {
    #[inline]
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Identity provider errors
///
/// None of these reach API callers: the token provider turns every variant
/// into "no token".
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Provider could not be contacted
    #[error("identity provider unreachable: {0}")]
    Unreachable(String),

    /// No signed-in user
    #[error("no active session")]
    NoActiveSession,

    /// Provider refused to issue a session
    #[error("identity provider rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider error description
        message: String,
    },

    /// Provider answered with something we could not parse
    #[error("malformed identity response: {0}")]
    Malformed(String),
}
