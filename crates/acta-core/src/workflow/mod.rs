//! Document workflow
//!
//! A run moves strictly forward through
//! `Idle -> Generating -> CheckingAvailability -> Downloading -> Done`.
//! `Failed` is reachable from every stage that talks to the backend and is
//! left only through [`WorkflowState::reset`].

mod orchestrator;

pub use orchestrator::{ApprovalReport, WorkflowOrchestrator, CANCELLED_CAUSE};

use crate::error::WorkflowError;
use acta_client::{ApiOutcome, Availability, DownloadReference};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Workflow stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing requested yet
    Idle,
    /// Generation request in flight
    Generating,
    /// Waiting for the document to exist
    CheckingAvailability,
    /// Resolving the download reference
    Downloading,
    /// Approval e-mail in flight (reported on [`ApprovalReport`] only)
    SendingApproval,
    /// Download reference available
    Done,
    /// A backend call failed
    Failed,
}

impl Stage {
    /// Check if the run has finished
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Check if a backend call may be outstanding
    #[inline]
    #[must_use]
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Generating | Self::CheckingAvailability | Self::Downloading | Self::SendingApproval
        )
    }

    /// Position along the main chain
    #[must_use]
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Generating => 1,
            Self::CheckingAvailability => 2,
            Self::Downloading => 3,
            Self::SendingApproval => 4,
            Self::Done | Self::Failed => 5,
        }
    }

    /// Snake-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::CheckingAvailability => "checking_availability",
            Self::Downloading => "downloading",
            Self::SendingApproval => "sending_approval",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forward transitions out of `from`
///
/// Leaving `Done` or `Failed` is not a transition; it is a reset.
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::{CheckingAvailability, Done, Downloading, Failed, Generating, Idle, SendingApproval};
    match from {
        Idle => vec![Generating],
        Generating => vec![CheckingAvailability, Failed],
        CheckingAvailability => vec![Downloading, Failed],
        Downloading => vec![Done, Failed],
        SendingApproval => vec![Done, Failed],
        Done | Failed => vec![],
    }
}

/// Validate a stage transition
///
/// # Errors
/// Returns `WorkflowError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Result of one orchestrator step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Moved to the given stage
    Advanced(Stage),
    /// Document not generated yet; the run stays in `CheckingAvailability`
    NotReady,
    /// The call failed and the run is now `Failed`
    Failed(ApiOutcome),
}

impl StepResult {
    /// Check if the step moved the run forward
    #[inline]
    #[must_use]
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }
}

/// Claim on a project id while its run is in flight
///
/// Dropping the lease frees the project for another run.
#[derive(Debug)]
pub(crate) struct RunLease {
    project_id: String,
    run_id: Uuid,
    registry: Arc<DashMap<String, Uuid>>,
}

impl RunLease {
    /// Register `run_id` for `project_id`, unless another run holds it
    pub(crate) fn acquire(
        registry: &Arc<DashMap<String, Uuid>>,
        project_id: &str,
        run_id: Uuid,
    ) -> Result<Self, WorkflowError> {
        use dashmap::mapref::entry::Entry;

        match registry.entry(project_id.to_string()) {
            Entry::Occupied(held) if *held.get() != run_id => Err(WorkflowError::AlreadyRunning {
                project_id: project_id.to_string(),
            }),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(run_id);
                Ok(())
            }
        }?;

        Ok(Self {
            project_id: project_id.to_string(),
            run_id,
            registry: Arc::clone(registry),
        })
    }
}

impl Drop for RunLease {
    fn drop(&mut self) {
        let run_id = self.run_id;
        self.registry
            .remove_if(&self.project_id, |_, held| *held == run_id);
    }
}

/// State of one document run
///
/// Owned by the caller and passed `&mut` to every step, so the steps of one
/// run cannot overlap.
#[derive(Debug)]
pub struct WorkflowState {
    run_id: Uuid,
    project_id: String,
    stage: Stage,
    last_error: Option<ApiOutcome>,
    document_id: Option<String>,
    availability: Option<Availability>,
    download: Option<DownloadReference>,
    history: Vec<Stage>,
    started_at: DateTime<Utc>,
    lease: Option<RunLease>,
}

impl WorkflowState {
    /// Create idle state for a project
    ///
    /// # Errors
    /// Returns `WorkflowError::EmptyProjectId` for a blank id.
    pub fn new(project_id: impl Into<String>) -> Result<Self, WorkflowError> {
        let project_id = normalize_project_id(project_id.into())?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            project_id,
            stage: Stage::Idle,
            last_error: None,
            document_id: None,
            availability: None,
            download: None,
            history: vec![Stage::Idle],
            started_at: Utc::now(),
            lease: None,
        })
    }

    /// Run identifier, renewed on reset
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Project identifier
    #[inline]
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Current stage
    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Failure that moved the run to `Failed`
    #[inline]
    #[must_use]
    pub fn last_error(&self) -> Option<&ApiOutcome> {
        self.last_error.as_ref()
    }

    /// Identifier of the generated document
    #[inline]
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// Last availability answer
    #[inline]
    #[must_use]
    pub fn availability(&self) -> Option<&Availability> {
        self.availability.as_ref()
    }

    /// Download reference, set once the run is `Done`
    #[inline]
    #[must_use]
    pub fn download(&self) -> Option<&DownloadReference> {
        self.download.as_ref()
    }

    /// Stages visited by this run, in order
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// When the run started
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Milliseconds since the run started
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        u64::try_from(elapsed.num_milliseconds()).unwrap_or(0)
    }

    /// Return to `Idle`, optionally for another project
    ///
    /// Discards the last error, availability and download reference, and
    /// starts a new run id.
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` while a step is in flight, or
    /// `WorkflowError::EmptyProjectId` for a blank replacement id.
    pub fn reset(&mut self, project_id: Option<String>) -> Result<(), WorkflowError> {
        if self.stage.is_in_flight() {
            return Err(WorkflowError::WrongStage {
                action: "reset",
                stage: self.stage,
            });
        }
        if let Some(project_id) = project_id {
            self.project_id = normalize_project_id(project_id)?;
        }

        tracing::debug!(project_id = %self.project_id, from = %self.stage, "workflow reset");
        self.lease = None;
        self.run_id = Uuid::new_v4();
        self.stage = Stage::Idle;
        self.last_error = None;
        self.document_id = None;
        self.availability = None;
        self.download = None;
        self.history = vec![Stage::Idle];
        self.started_at = Utc::now();
        Ok(())
    }

    pub(crate) fn require(&self, action: &'static str, stage: Stage) -> Result<(), WorkflowError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(WorkflowError::WrongStage {
                action,
                stage: self.stage,
            })
        }
    }

    pub(crate) fn begin(&mut self, lease: RunLease) {
        self.lease = Some(lease);
        self.started_at = Utc::now();
    }

    pub(crate) fn advance(&mut self, to: Stage) -> Result<(), WorkflowError> {
        validate_transition(self.stage, to)?;
        tracing::info!(
            project_id = %self.project_id,
            run_id = %self.run_id,
            from = %self.stage,
            to = %to,
            "workflow stage"
        );
        self.stage = to;
        self.history.push(to);
        if to.is_terminal() {
            self.lease = None;
        }
        Ok(())
    }

    pub(crate) fn fail(&mut self, outcome: ApiOutcome) -> Result<(), WorkflowError> {
        self.advance(Stage::Failed)?;
        tracing::error!(
            project_id = %self.project_id,
            run_id = %self.run_id,
            kind = %outcome.kind(),
            "workflow failed"
        );
        self.last_error = Some(outcome);
        Ok(())
    }

    pub(crate) fn set_document_id(&mut self, document_id: String) {
        self.document_id = Some(document_id);
    }

    pub(crate) fn set_availability(&mut self, availability: Availability) {
        self.availability = Some(availability);
    }

    pub(crate) fn set_download(&mut self, download: DownloadReference) {
        self.download = Some(download);
    }
}

fn normalize_project_id(project_id: String) -> Result<String, WorkflowError> {
    let trimmed = project_id.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::EmptyProjectId);
    }
    Ok(trimmed.to_string())
}
