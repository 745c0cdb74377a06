//! Error types for the API client
//!
//! Request outcomes are not errors: they are [`crate::ApiOutcome`] values.
//! These types cover client construction and response decoding only.

/// Client construction errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Base URL does not parse
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl {
        /// Rejected input
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// HTTP transport could not be built
    #[error("failed to build http transport: {0}")]
    TransportInit(String),
}

/// Response body did not match the endpoint's contract
#[derive(Debug, thiserror::Error)]
#[error("cannot decode {expected} from response: {reason}")]
pub struct DecodeError {
    /// Name of the expected type
    pub expected: &'static str,
    /// Parser message
    pub reason: String,
}

impl DecodeError {
    #[inline]
    pub(crate) fn new(expected: &'static str, reason: impl Into<String>) -> Self {
        Self {
            expected,
            reason: reason.into(),
        }
    }
}
