//! Classified call results
//!
//! Classification happens exactly once, in [`classify`], at the transport
//! boundary. Everything above works on [`ApiOutcome`].

use crate::error::DecodeError;
use crate::transport::{RawResponse, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Result of one API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    /// 2xx, or a 3xx redirect whose target is carried in `location`
    Success {
        /// HTTP status
        status: u16,
        /// Body text
        body: String,
        /// `Location` header
        location: Option<String>,
    },
    /// 401 or 403: the token was rejected
    AuthFailure {
        /// HTTP status
        status: u16,
    },
    /// The request never produced a response
    NetworkFailure {
        /// Transport error description
        cause: String,
    },
    /// 5xx
    ServerFailure {
        /// HTTP status
        status: u16,
        /// Body text
        body: String,
    },
    /// Any other 4xx
    ClientFailure {
        /// HTTP status
        status: u16,
        /// Body text
        body: String,
    },
}

/// Outcome discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Success
    Success,
    /// AuthFailure
    AuthFailure,
    /// NetworkFailure
    NetworkFailure,
    /// ServerFailure
    ServerFailure,
    /// ClientFailure
    ClientFailure,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::AuthFailure => "auth_failure",
            Self::NetworkFailure => "network_failure",
            Self::ServerFailure => "server_failure",
            Self::ClientFailure => "client_failure",
        };
        f.write_str(name)
    }
}

/// What the person in front of the screen should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    /// Nothing, the call succeeded
    None,
    /// Sign in again
    Reauthenticate,
    /// Try the same action again
    Retry,
    /// Backend problem; show a generic failure
    ContactSupport,
}

/// Map a transport result to an outcome
#[must_use]
pub fn classify(result: Result<RawResponse, TransportError>) -> ApiOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            return ApiOutcome::NetworkFailure {
                cause: e.to_string(),
            }
        }
    };

    let RawResponse {
        status,
        location,
        body,
    } = response;

    match status {
        200..=399 => ApiOutcome::Success {
            status,
            body,
            location,
        },
        401 | 403 => ApiOutcome::AuthFailure { status },
        500..=599 => ApiOutcome::ServerFailure { status, body },
        _ => ApiOutcome::ClientFailure { status, body },
    }
}

impl ApiOutcome {
    /// Discriminant
    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success { .. } => OutcomeKind::Success,
            Self::AuthFailure { .. } => OutcomeKind::AuthFailure,
            Self::NetworkFailure { .. } => OutcomeKind::NetworkFailure,
            Self::ServerFailure { .. } => OutcomeKind::ServerFailure,
            Self::ClientFailure { .. } => OutcomeKind::ClientFailure,
        }
    }

    /// Whether the call succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The only kind the client retries
    #[inline]
    #[must_use]
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. })
    }

    /// HTTP status, if a response was received
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Success { status, .. }
            | Self::AuthFailure { status }
            | Self::ServerFailure { status, .. }
            | Self::ClientFailure { status, .. } => Some(*status),
            Self::NetworkFailure { .. } => None,
        }
    }

    /// Body of a successful call
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Redirect target of a successful call
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Success { location, .. } => location.as_deref(),
            _ => None,
        }
    }

    /// Recommended next step for the user
    #[must_use]
    pub fn user_action(&self) -> UserAction {
        match self {
            Self::Success { .. } => UserAction::None,
            Self::AuthFailure { .. } => UserAction::Reauthenticate,
            Self::NetworkFailure { .. } => UserAction::Retry,
            Self::ServerFailure { .. } | Self::ClientFailure { .. } => UserAction::ContactSupport,
        }
    }

    /// User-facing message without backend internals
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Success { .. } => "request completed".to_string(),
            Self::AuthFailure { .. } => "your session has expired, please sign in again".to_string(),
            Self::NetworkFailure { .. } => {
                "unable to reach the API, check your connection and try again".to_string()
            }
            Self::ServerFailure { status, .. } | Self::ClientFailure { status, .. } => {
                format!("the request failed ({status}), please contact support if it persists")
            }
        }
    }

    /// Decode a successful JSON body
    ///
    /// # Errors
    /// Returns `DecodeError` if the outcome is not a success or the body does
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let expected = std::any::type_name::<T>();
        let body = self
            .body()
            .ok_or_else(|| DecodeError::new(expected, format!("outcome is {}", self.kind())))?;
        serde_json::from_str(body).map_err(|e| DecodeError::new(expected, e.to_string()))
    }

    /// Re-label a success whose body broke the endpoint contract
    ///
    /// Failures are returned unchanged.
    #[must_use]
    pub fn into_contract_violation(self, error: &DecodeError) -> Self {
        match self {
            Self::Success { status, body, .. } => {
                tracing::error!(status, error = %error, "response violates endpoint contract");
                Self::ServerFailure { status, body }
            }
            other => other,
        }
    }
}

impl fmt::Display for ApiOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { status, .. } => write!(f, "success ({status})"),
            Self::AuthFailure { status } => write!(f, "authentication rejected ({status})"),
            Self::NetworkFailure { cause } => write!(f, "network failure: {cause}"),
            Self::ServerFailure { status, .. } => write!(f, "server failure ({status})"),
            Self::ClientFailure { status, .. } => write!(f, "request rejected ({status})"),
        }
    }
}
