//! End-to-end workflow runs against scripted transports

use acta_auth::{BearerToken, Session, SessionSource, SKIP_AUTH_TOKEN};
use acta_client::{endpoints, ApiOutcome, DocumentFormat, OutcomeKind, RawResponse, UserAction};
use acta_core::telemetry::actions;
use acta_core::{
    ActaConfig, ActaError, Stage, StepResult, WorkflowError, WorkflowState, CANCELLED_CAUSE,
};
use acta_test_utils::{connection_refused, Harness, ScriptedIdentity, ScriptedTransport};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;

fn ready_backend(project_id: &str) -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    transport.respond_json(
        &format!("/extract-project-place/{project_id}"),
        200,
        json!({ "message": "ok", "s3_location": format!("s3://acta/{project_id}.docx") }),
    );
    transport.respond_json(
        &format!("/check-document/{project_id}"),
        200,
        json!({ "available": true, "size": 1024 }),
    );
    transport.respond_json(
        &format!("/download-acta/{project_id}"),
        200,
        json!({ "url": format!("https://s3.example.com/{project_id}.pdf") }),
    );
    transport
}

#[tokio::test]
async fn successful_run_reaches_done() {
    let harness = Harness::signed_in_with(ready_backend("123"), "token");
    let mut state = WorkflowState::new("123").unwrap();

    let step = harness
        .acta
        .orchestrator()
        .run(&mut state, DocumentFormat::Pdf)
        .await
        .unwrap();

    assert_eq!(step, StepResult::Advanced(Stage::Done));
    assert_eq!(state.stage(), Stage::Done);
    assert_eq!(state.download().unwrap().url, "https://s3.example.com/123.pdf");
    assert!(state.last_error().is_none());
    assert_eq!(
        harness.transport.paths(),
        vec![
            "/prod/extract-project-place/123",
            "/prod/check-document/123",
            "/prod/download-acta/123",
        ]
    );

    let records = harness.telemetry.records_for(actions::GENERATE_DOCUMENT);
    assert_eq!(records.len(), 1);
    assert!(records[0].success);
    assert_eq!(records[0].project_id_prefix, "123...");
    assert!(!harness.acta.orchestrator().is_running("123"));
}

#[tokio::test]
async fn network_failure_during_generation_fails_after_two_attempts() {
    let transport = ScriptedTransport::new();
    transport.fail("/extract-project-place/456", connection_refused());
    let harness = Harness::signed_in_with(transport, "token");
    let mut state = WorkflowState::new("456").unwrap();

    let step = harness
        .acta
        .orchestrator()
        .run(&mut state, DocumentFormat::Pdf)
        .await
        .unwrap();

    assert!(matches!(step, StepResult::Failed(ApiOutcome::NetworkFailure { .. })));
    assert_eq!(harness.transport.attempts(), 2);
    assert_eq!(state.stage(), Stage::Failed);
    assert_eq!(state.last_error().unwrap().kind(), OutcomeKind::NetworkFailure);

    let records = harness.telemetry.records();
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);
    assert!(records[0].error.is_some());
}

#[tokio::test]
async fn document_not_ready_keeps_checking_stage() {
    let transport = ScriptedTransport::new();
    transport.respond_json("/extract-project-place/789", 200, json!({}));
    transport.respond_json("/check-document/789", 200, json!({ "available": false }));
    let harness = Harness::signed_in_with(transport, "token");
    let mut state = WorkflowState::new("789").unwrap();

    let step = harness
        .acta
        .orchestrator()
        .run(&mut state, DocumentFormat::Pdf)
        .await
        .unwrap();

    assert_eq!(step, StepResult::NotReady);
    assert_eq!(state.stage(), Stage::CheckingAvailability);
    assert!(state.last_error().is_none());
    assert_eq!(harness.transport.attempts_to("/download-acta/789"), 0);
    assert!(harness.acta.orchestrator().is_running("789"));
    assert!(harness.telemetry.records().is_empty());
}

#[tokio::test]
async fn not_ready_run_can_be_resumed() {
    let transport = ScriptedTransport::new();
    transport.respond_json("/extract-project-place/789", 200, json!({ "documentId": "doc-789" }));
    transport.respond("/check-document/789", RawResponse::new(404, "{}"));
    transport.respond("/check-document/789", RawResponse::new(200, ""));
    transport.respond(
        "/download-acta/789",
        RawResponse::new(302, "").with_location("https://s3.example.com/789.pdf"),
    );
    let harness = Harness::signed_in_with(transport, "token");
    let orchestrator = harness.acta.orchestrator();
    let mut state = WorkflowState::new("789").unwrap();

    assert_eq!(
        orchestrator.run(&mut state, DocumentFormat::Pdf).await.unwrap(),
        StepResult::NotReady
    );
    assert_eq!(
        orchestrator.resume(&mut state, DocumentFormat::Pdf).await.unwrap(),
        StepResult::Advanced(Stage::Done)
    );
    assert_eq!(state.document_id(), Some("doc-789"));
    assert_eq!(state.download().unwrap().url, "https://s3.example.com/789.pdf");
}

#[tokio::test]
async fn absent_token_gets_auth_failure() {
    let transport = ScriptedTransport::new();
    transport.respond("/projects", RawResponse::new(401, r#"{"message":"Unauthorized"}"#));
    let harness = Harness::new(transport, ScriptedIdentity::failing());
    assert!(harness.store.is_empty());

    let outcome = harness.acta.api().projects().await.unwrap_err();

    assert_eq!(outcome, ApiOutcome::AuthFailure { status: 401 });
    assert_eq!(outcome.user_action(), UserAction::Reauthenticate);
    assert_eq!(harness.transport.attempts(), 1);
    assert_eq!(harness.bearers(), vec![None]);
    assert!(harness.identity.call_count() > 0);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn expired_token_gets_auth_failure_and_clears_store() {
    let transport = ScriptedTransport::new();
    transport.respond("/projects", RawResponse::new(401, r#"{"message":"Unauthorized"}"#));
    let harness = Harness::new(transport, ScriptedIdentity::failing());
    harness
        .store
        .set(
            Session::new(BearerToken::new("stale"), SessionSource::IdentityProvider)
                .with_expiry(Utc::now() - Duration::hours(1)),
        )
        .unwrap();

    let outcome = harness.acta.api().projects().await.unwrap_err();

    assert_eq!(outcome, ApiOutcome::AuthFailure { status: 401 });
    assert_eq!(outcome.user_action(), UserAction::Reauthenticate);
    assert_eq!(harness.transport.attempts(), 1);
    assert_eq!(harness.bearers(), vec![None]);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn stages_are_never_revisited() {
    let harness = Harness::signed_in_with(ready_backend("123"), "token");
    let mut state = WorkflowState::new("123").unwrap();

    harness
        .acta
        .orchestrator()
        .run(&mut state, DocumentFormat::Pdf)
        .await
        .unwrap();

    assert_eq!(
        state.history(),
        &[
            Stage::Idle,
            Stage::Generating,
            Stage::CheckingAvailability,
            Stage::Downloading,
            Stage::Done,
        ]
    );
}

#[tokio::test]
async fn failed_approval_leaves_finished_run_untouched() {
    let transport = ready_backend("123");
    transport.respond("/send-approval-email", RawResponse::new(500, "smtp down"));
    let harness = Harness::signed_in_with(transport, "token");
    let orchestrator = harness.acta.orchestrator();
    let mut state = WorkflowState::new("123").unwrap();
    orchestrator.run(&mut state, DocumentFormat::Pdf).await.unwrap();

    let report = orchestrator
        .send_approval_for(&state, "client@example.com")
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.stage, Stage::Failed);
    assert_eq!(report.document_id, "123");
    assert_eq!(report.user_action(), UserAction::ContactSupport);
    assert_eq!(state.stage(), Stage::Done);
    assert!(state.download().is_some());
    assert!(state.last_error().is_none());

    let approvals = harness.telemetry.records_for(actions::SEND_APPROVAL);
    assert_eq!(approvals.len(), 1);
    assert!(!approvals[0].success);
}

#[tokio::test]
async fn approval_sends_backend_field_names() {
    let transport = ScriptedTransport::new();
    transport.respond_json("/send-approval-email", 200, json!({ "message": "sent", "token": "abc" }));
    let harness = Harness::signed_in_with(transport, "token");

    let report = harness
        .acta
        .orchestrator()
        .send_approval("acta-1", "client@example.com")
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.response.unwrap().token.as_deref(), Some("abc"));
    let sent = harness.transport.requests();
    assert_eq!(
        sent[0].body,
        Some(json!({ "actaId": "acta-1", "clientEmail": "client@example.com" }))
    );
}

#[tokio::test]
async fn approval_requires_finished_run() {
    let harness = Harness::signed_in("token");
    let state = WorkflowState::new("123").unwrap();

    let err = harness
        .acta
        .orchestrator()
        .send_approval_for(&state, "client@example.com")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::WrongStage {
            action: "send approval",
            stage: Stage::Idle
        }
    );
    assert_eq!(harness.transport.attempts(), 0);
}

#[tokio::test]
async fn invalid_recipient_is_rejected_before_any_call() {
    let harness = Harness::signed_in("token");

    let err = harness
        .acta
        .orchestrator()
        .send_approval("acta-1", "not-an-email")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidRecipient(_)));
    assert_eq!(harness.transport.attempts(), 0);
}

#[tokio::test]
async fn second_run_for_same_project_is_rejected_while_first_is_open() {
    let transport = ScriptedTransport::new();
    transport.respond_json("/extract-project-place/789", 200, json!({}));
    transport.respond_json("/check-document/789", 200, json!({ "available": false }));
    let harness = Harness::signed_in_with(transport, "token");
    let orchestrator = harness.acta.orchestrator();

    let mut first = WorkflowState::new("789").unwrap();
    orchestrator.run(&mut first, DocumentFormat::Pdf).await.unwrap();

    let mut second = WorkflowState::new("789").unwrap();
    let err = orchestrator
        .generate(&mut second)
        .await
        .map_err(ActaError::from)
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(second.stage(), Stage::Idle);

    drop(first);
    assert!(orchestrator.generate(&mut second).await.is_ok());
}

#[tokio::test]
async fn cancelled_run_fails_and_releases_project() {
    let transport = ScriptedTransport::new();
    transport.stall("/extract-project-place/123");
    let harness = Harness::signed_in_with(transport, "token");
    let orchestrator = harness.acta.orchestrator();
    let mut state = WorkflowState::new("123").unwrap();

    let run = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        orchestrator.run(&mut state, DocumentFormat::Pdf),
    )
    .await;

    assert!(run.is_err());
    assert_eq!(state.stage(), Stage::Failed);
    assert_eq!(
        state.last_error(),
        Some(&ApiOutcome::NetworkFailure {
            cause: CANCELLED_CAUSE.to_string()
        })
    );
    assert!(!orchestrator.is_running("123"));

    let records = harness.telemetry.records_for(actions::GENERATE_DOCUMENT);
    assert_eq!(records.len(), 1);
    assert!(!records[0].success);

    // A new run gets past the lease and reaches the backend again.
    let mut next = WorkflowState::new("123").unwrap();
    let second = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        orchestrator.generate(&mut next),
    )
    .await;
    assert!(second.is_err());
    assert_eq!(harness.transport.attempts_to("/extract-project-place/123"), 2);
    assert_eq!(next.stage(), Stage::Failed);

    state.reset(None).unwrap();
    assert_eq!(state.stage(), Stage::Idle);
}

#[tokio::test]
async fn step_out_of_order_is_rejected() {
    let harness = Harness::signed_in("token");
    let mut state = WorkflowState::new("123").unwrap();

    let err = harness
        .acta
        .orchestrator()
        .download(&mut state, DocumentFormat::Pdf)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "cannot download while idle");
    assert_eq!(harness.transport.attempts(), 0);
}

#[tokio::test]
async fn reset_after_failure_starts_a_clean_run() {
    let transport = ScriptedTransport::new();
    transport.respond("/extract-project-place/123", RawResponse::new(500, "boom"));
    let harness = Harness::signed_in_with(transport, "token");
    let orchestrator = harness.acta.orchestrator();
    let mut state = WorkflowState::new("123").unwrap();

    orchestrator.run(&mut state, DocumentFormat::Pdf).await.unwrap();
    assert_eq!(state.stage(), Stage::Failed);
    assert!(orchestrator.generate(&mut state).await.is_err());

    state.reset(None).unwrap();
    assert_eq!(state.stage(), Stage::Idle);
    assert!(state.last_error().is_none());
    assert!(matches!(
        orchestrator.generate(&mut state).await.unwrap(),
        StepResult::Failed(ApiOutcome::ServerFailure { status: 500, .. })
    ));
}

#[tokio::test]
async fn skip_auth_sends_synthetic_token_without_identity() {
    let transport = ScriptedTransport::new();
    transport.respond("/projects", RawResponse::new(200, r#"{"projects":[{"project_id":"1","project_name":"Alpha"}]}"#));
    let harness = Harness::with_config(
        ActaConfig::new().with_skip_auth(true),
        transport,
        ScriptedIdentity::failing(),
    );

    let projects = harness.acta.api().projects().await.unwrap();

    assert_eq!(projects.len(), 1);
    assert_eq!(harness.bearers(), vec![Some(SKIP_AUTH_TOKEN.to_string())]);
    assert_eq!(harness.identity.call_count(), 0);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn unauthenticated_endpoint_carries_no_header() {
    let transport = ScriptedTransport::new();
    transport.respond("/health", RawResponse::new(200, r#"{"status":"ok"}"#));
    let harness = Harness::signed_in_with(transport, "token");

    let outcome = harness.acta.api().client().call(endpoints::health()).await;

    assert!(outcome.is_success());
    assert_eq!(harness.bearers(), vec![None]);
    assert_eq!(harness.identity.call_count(), 0);
}
