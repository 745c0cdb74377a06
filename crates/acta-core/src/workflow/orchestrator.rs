//! Workflow orchestrator
//!
//! Sequences generate, check and download for a [`WorkflowState`], one
//! backend call per step, and runs approval e-mails as a side branch.

use super::{RunLease, Stage, StepResult, WorkflowState};
use crate::error::WorkflowError;
use crate::telemetry::{actions, TelemetryRecord, TelemetrySink};
use acta_client::{ActaApi, ApiOutcome, ApprovalResponse, DocumentFormat, UserAction};
use dashmap::DashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Result of an approval request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReport {
    /// Document the approval is for
    pub document_id: String,
    /// Who receives the e-mail
    pub recipient: String,
    /// `Done` or `Failed`
    pub stage: Stage,
    /// Backend answer on success
    pub response: Option<ApprovalResponse>,
    /// Failure on error
    pub error: Option<ApiOutcome>,
    /// Wall time of the call
    pub duration_ms: u64,
}

impl ApprovalReport {
    /// Check if the e-mail was accepted
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Recommended next step for the user
    #[must_use]
    pub fn user_action(&self) -> UserAction {
        self.error
            .as_ref()
            .map_or(UserAction::None, ApiOutcome::user_action)
    }
}

/// Drives document runs against the Acta API
pub struct WorkflowOrchestrator {
    api: ActaApi,
    telemetry: Arc<dyn TelemetrySink>,
    in_flight: Arc<DashMap<String, Uuid>>,
}

impl fmt::Debug for WorkflowOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowOrchestrator")
            .field("api", &self.api)
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl WorkflowOrchestrator {
    /// Create new orchestrator
    #[must_use]
    pub fn new(api: ActaApi, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            api,
            telemetry,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Typed API
    #[inline]
    #[must_use]
    pub fn api(&self) -> &ActaApi {
        &self.api
    }

    /// Check if a run for `project_id` has not finished
    #[must_use]
    pub fn is_running(&self, project_id: &str) -> bool {
        self.in_flight.contains_key(project_id.trim())
    }

    /// Number of unfinished runs
    #[must_use]
    pub fn running(&self) -> usize {
        self.in_flight.len()
    }

    /// Request document generation
    ///
    /// `Idle -> Generating -> CheckingAvailability`, or `Failed`.
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` unless the run is idle, or
    /// `WorkflowError::AlreadyRunning` if the project has an unfinished run.
    pub async fn generate(&self, state: &mut WorkflowState) -> Result<StepResult, WorkflowError> {
        state.require("generate", Stage::Idle)?;
        let lease = RunLease::acquire(&self.in_flight, state.project_id(), state.run_id())?;
        state.begin(lease);
        state.advance(Stage::Generating)?;

        let mut state = StepGuard::new(state, self.telemetry.as_ref());
        let result = self.api.generate_document(state.project_id()).await;
        state.disarm();
        match result {
            Ok(response) => {
                let document_id = response.document_id_or(state.project_id());
                tracing::debug!(
                    project_id = %state.project_id(),
                    document_id = %document_id,
                    location = ?response.location(),
                    "generation accepted"
                );
                state.set_document_id(document_id);
                state.advance(Stage::CheckingAvailability)?;
                Ok(StepResult::Advanced(Stage::CheckingAvailability))
            }
            Err(outcome) => self.fail(&mut state, outcome),
        }
    }

    /// Ask whether the generated document exists
    ///
    /// Moves to `Downloading` when it does; otherwise stays put and returns
    /// [`StepResult::NotReady`]. The caller decides when to ask again.
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` outside `CheckingAvailability`.
    pub async fn check_availability(
        &self,
        state: &mut WorkflowState,
        format: DocumentFormat,
    ) -> Result<StepResult, WorkflowError> {
        state.require("check availability", Stage::CheckingAvailability)?;

        let mut state = StepGuard::new(state, self.telemetry.as_ref());
        let result = self.api.check_document(state.project_id(), format).await;
        state.disarm();
        match result {
            Ok(availability) if availability.available => {
                state.set_availability(availability);
                state.advance(Stage::Downloading)?;
                Ok(StepResult::Advanced(Stage::Downloading))
            }
            Ok(availability) => {
                tracing::info!(project_id = %state.project_id(), %format, "document not ready");
                state.set_availability(availability);
                Ok(StepResult::NotReady)
            }
            Err(outcome) => self.fail(&mut state, outcome),
        }
    }

    /// Resolve the download reference
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` outside `Downloading`.
    pub async fn download(
        &self,
        state: &mut WorkflowState,
        format: DocumentFormat,
    ) -> Result<StepResult, WorkflowError> {
        state.require("download", Stage::Downloading)?;

        let mut state = StepGuard::new(state, self.telemetry.as_ref());
        let result = self.api.download_reference(state.project_id(), format).await;
        state.disarm();
        match result {
            Ok(reference) => {
                state.set_download(reference);
                state.advance(Stage::Done)?;
                self.telemetry.record(TelemetryRecord::new(
                    actions::GENERATE_DOCUMENT,
                    state.project_id(),
                    true,
                    state.elapsed_ms(),
                ));
                Ok(StepResult::Advanced(Stage::Done))
            }
            Err(outcome) => self.fail(&mut state, outcome),
        }
    }

    /// Generate, check and download, stopping at `NotReady` or `Failed`
    ///
    /// # Errors
    /// Same as [`Self::generate`].
    pub async fn run(
        &self,
        state: &mut WorkflowState,
        format: DocumentFormat,
    ) -> Result<StepResult, WorkflowError> {
        let step = self.generate(state).await?;
        if !step.is_advanced() {
            return Ok(step);
        }
        self.resume(state, format).await
    }

    /// Continue a run from `CheckingAvailability` or `Downloading`
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` from any other stage.
    pub async fn resume(
        &self,
        state: &mut WorkflowState,
        format: DocumentFormat,
    ) -> Result<StepResult, WorkflowError> {
        match state.stage() {
            Stage::CheckingAvailability => {
                let step = self.check_availability(state, format).await?;
                if !step.is_advanced() {
                    return Ok(step);
                }
                self.download(state, format).await
            }
            Stage::Downloading => self.download(state, format).await,
            stage => Err(WorkflowError::WrongStage {
                action: "resume",
                stage,
            }),
        }
    }

    /// E-mail an approval request for a document
    ///
    /// Independent of any run: no [`WorkflowState`] is touched. A backend
    /// failure is reported on the returned [`ApprovalReport`].
    ///
    /// # Errors
    /// Returns `WorkflowError::EmptyProjectId` for a blank document id or
    /// `WorkflowError::InvalidRecipient` for a malformed address.
    pub async fn send_approval(
        &self,
        document_id: &str,
        recipient: &str,
    ) -> Result<ApprovalReport, WorkflowError> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(WorkflowError::EmptyProjectId);
        }
        let recipient = validate_recipient(recipient)?;

        tracing::info!(document_id, stage = %Stage::SendingApproval, "sending approval request");
        let started = Instant::now();
        let result = self.api.send_approval_email(document_id, &recipient).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = match result {
            Ok(response) => ApprovalReport {
                document_id: document_id.to_string(),
                recipient,
                stage: Stage::Done,
                response: Some(response),
                error: None,
                duration_ms,
            },
            Err(outcome) => {
                tracing::warn!(document_id, kind = %outcome.kind(), "approval request failed");
                ApprovalReport {
                    document_id: document_id.to_string(),
                    recipient,
                    stage: Stage::Failed,
                    response: None,
                    error: Some(outcome),
                    duration_ms,
                }
            }
        };

        let mut record =
            TelemetryRecord::new(actions::SEND_APPROVAL, document_id, report.is_success(), duration_ms);
        if let Some(error) = &report.error {
            record = record.with_error(error.message());
        }
        self.telemetry.record(record);

        Ok(report)
    }

    /// E-mail an approval request for the document of a finished run
    ///
    /// # Errors
    /// Returns `WorkflowError::WrongStage` unless the run is `Done`, plus the
    /// errors of [`Self::send_approval`].
    pub async fn send_approval_for(
        &self,
        state: &WorkflowState,
        recipient: &str,
    ) -> Result<ApprovalReport, WorkflowError> {
        state.require("send approval", Stage::Done)?;
        let document_id = state.document_id().unwrap_or(state.project_id());
        self.send_approval(document_id, recipient).await
    }

    fn fail(&self, state: &mut WorkflowState, outcome: ApiOutcome) -> Result<StepResult, WorkflowError> {
        state.fail(outcome.clone())?;
        record_failure(self.telemetry.as_ref(), state, &outcome);
        Ok(StepResult::Failed(outcome))
    }
}

fn record_failure(telemetry: &dyn TelemetrySink, state: &WorkflowState, outcome: &ApiOutcome) {
    telemetry.record(
        TelemetryRecord::new(
            actions::GENERATE_DOCUMENT,
            state.project_id(),
            false,
            state.elapsed_ms(),
        )
        .with_error(outcome.message()),
    );
}

/// Cause recorded when a step future is dropped mid-call
pub const CANCELLED_CAUSE: &str = "cancelled";

/// Fails the run if the step future is dropped while its call is pending
///
/// The run moves to `Failed` with a [`CANCELLED_CAUSE`] network failure and
/// the project lease is released.
struct StepGuard<'a> {
    state: &'a mut WorkflowState,
    telemetry: &'a dyn TelemetrySink,
    armed: bool,
}

impl<'a> StepGuard<'a> {
    fn new(state: &'a mut WorkflowState, telemetry: &'a dyn TelemetrySink) -> Self {
        Self {
            state,
            telemetry,
            armed: true,
        }
    }

    /// The call returned; the step handles the outcome itself
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Deref for StepGuard<'_> {
    type Target = WorkflowState;

    fn deref(&self) -> &WorkflowState {
        self.state
    }
}

impl DerefMut for StepGuard<'_> {
    fn deref_mut(&mut self) -> &mut WorkflowState {
        self.state
    }
}

impl Drop for StepGuard<'_> {
    fn drop(&mut self) {
        if !self.armed || self.state.stage().is_terminal() {
            return;
        }
        tracing::warn!(
            project_id = %self.state.project_id(),
            stage = %self.state.stage(),
            "workflow step abandoned"
        );
        let outcome = ApiOutcome::NetworkFailure {
            cause: CANCELLED_CAUSE.to_string(),
        };
        if self.state.fail(outcome.clone()).is_ok() {
            record_failure(self.telemetry, self.state, &outcome);
        }
    }
}

fn validate_recipient(recipient: &str) -> Result<String, WorkflowError> {
    let trimmed = recipient.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !trimmed.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(WorkflowError::InvalidRecipient(recipient.to_string()))
    }
}
