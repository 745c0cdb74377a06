//! Error types for Acta Core
//!
//! Provides error handling for:
//! - Configuration loading and validation
//! - Workflow misuse (wrong stage, concurrent runs)
//! - Failures bubbling up from the auth and client layers

use crate::workflow::Stage;
use acta_auth::SessionError;
use acta_client::{ApiOutcome, ClientError, UserAction};
use std::path::PathBuf;

/// Main Acta error type
#[derive(Debug, thiserror::Error)]
pub enum ActaError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session persistence error
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Client construction error
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Workflow misuse
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// API call failed
    #[error("api call failed: {0}")]
    Api(ApiOutcome),
}

impl ActaError {
    /// Check if repeating the same action may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(outcome) => outcome.is_network_failure(),
            Self::Workflow(WorkflowError::AlreadyRunning { .. }) => true,
            _ => false,
        }
    }

    /// Recommended next step for the user
    #[must_use]
    pub fn user_action(&self) -> UserAction {
        match self {
            Self::Api(outcome) => outcome.user_action(),
            Self::Workflow(WorkflowError::AlreadyRunning { .. }) => UserAction::Retry,
            _ => UserAction::ContactSupport,
        }
    }
}

impl From<ApiOutcome> for ActaError {
    fn from(outcome: ApiOutcome) -> Self {
        Self::Api(outcome)
    }
}

/// Workflow misuse errors
///
/// Failed API calls are not workflow errors: they move the run to
/// [`Stage::Failed`] and are recorded on the state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Transition not in the stage table
    #[error("illegal stage transition {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },

    /// Operation invoked from the wrong stage
    #[error("cannot {action} while {stage}")]
    WrongStage {
        /// Operation name
        action: &'static str,
        /// Stage the run was in
        stage: Stage,
    },

    /// Another run for the same project has not finished
    #[error("a run for project {project_id} is already in progress")]
    AlreadyRunning {
        /// Project identifier
        project_id: String,
    },

    /// Project identifier is blank
    #[error("project id must not be empty")]
    EmptyProjectId,

    /// Approval e-mail target is not an address
    #[error("invalid approval recipient '{0}'")]
    InvalidRecipient(String),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config file {path}: {source}")]
    Read {
        /// File location
        path: PathBuf,
        /// Underlying io error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`crate::ActaConfig`]
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Field value rejected
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl ConfigError {
    #[inline]
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acta_error_display() {
        let err = ActaError::Workflow(WorkflowError::EmptyProjectId);
        assert!(err.to_string().contains("project id"));
    }

    #[test]
    fn only_network_failures_are_retryable() {
        let network = ActaError::Api(ApiOutcome::NetworkFailure {
            cause: "reset".to_string(),
        });
        let auth = ActaError::Api(ApiOutcome::AuthFailure { status: 401 });
        let server = ActaError::Api(ApiOutcome::ServerFailure {
            status: 502,
            body: String::new(),
        });

        assert!(network.is_retryable());
        assert!(!auth.is_retryable());
        assert!(!server.is_retryable());
        assert_eq!(auth.user_action(), UserAction::Reauthenticate);
    }

    #[test]
    fn concurrent_run_is_retryable() {
        let err = ActaError::from(WorkflowError::AlreadyRunning {
            project_id: "123".to_string(),
        });
        assert!(err.is_retryable());
        assert_eq!(err.user_action(), UserAction::Retry);
    }

    #[test]
    fn wrong_stage_names_action() {
        let err = WorkflowError::WrongStage {
            action: "download",
            stage: Stage::Idle,
        };
        assert_eq!(err.to_string(), "cannot download while idle");
    }
}
