//! Workflow telemetry
//!
//! Records are fire-and-forget: a sink cannot fail the workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of project id characters kept in telemetry
pub const PROJECT_ID_PREFIX_LEN: usize = 8;

/// Action names
pub mod actions {
    /// Generation run reached `Done` or `Failed`
    pub const GENERATE_DOCUMENT: &str = "generate_document";
    /// Approval e-mail request
    pub const SEND_APPROVAL: &str = "send_approval";
}

/// One telemetry event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// What was attempted
    pub action: String,
    /// Truncated project id
    pub project_id_prefix: String,
    /// Whether it worked
    pub success: bool,
    /// Wall time of the action
    pub duration_ms: u64,
    /// Generic failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When it finished
    pub timestamp: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Create record stamped now
    #[must_use]
    pub fn new(action: impl Into<String>, project_id: &str, success: bool, duration_ms: u64) -> Self {
        Self {
            action: action.into(),
            project_id_prefix: project_id_prefix(project_id),
            success,
            duration_ms,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// With failure message
    #[inline]
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// First eight characters of a project id followed by `...`
#[must_use]
pub fn project_id_prefix(project_id: &str) -> String {
    let prefix: String = project_id.chars().take(PROJECT_ID_PREFIX_LEN).collect();
    format!("{prefix}...")
}

/// Telemetry destination
pub trait TelemetrySink: Send + Sync {
    /// Consume one record
    fn record(&self, record: TelemetryRecord);
}

/// Sink emitting `tracing` events and `metrics` series
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TelemetrySink for TracingSink {
    fn record(&self, record: TelemetryRecord) {
        let outcome = if record.success { "success" } else { "failure" };

        metrics::counter!(
            "acta_workflow_actions_total",
            "action" => record.action.clone(),
            "outcome" => outcome
        )
        .increment(1);
        #[allow(clippy::cast_precision_loss)]
        let duration = record.duration_ms as f64;
        metrics::histogram!("acta_workflow_duration_ms", "action" => record.action.clone())
            .record(duration);

        if record.success {
            tracing::info!(
                target: "acta::telemetry",
                action = %record.action,
                project = %record.project_id_prefix,
                duration_ms = record.duration_ms,
                "action completed"
            );
        } else {
            tracing::warn!(
                target: "acta::telemetry",
                action = %record.action,
                project = %record.project_id_prefix,
                duration_ms = record.duration_ms,
                error = record.error.as_deref().unwrap_or("unknown"),
                "action failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefix_truncates_long_ids() {
        assert_eq!(project_id_prefix("1234567890abc"), "12345678...");
    }

    #[test]
    fn prefix_keeps_short_ids() {
        assert_eq!(project_id_prefix("123"), "123...");
        assert_eq!(project_id_prefix(""), "...");
    }

    #[test]
    fn prefix_respects_char_boundaries() {
        assert_eq!(project_id_prefix("proyecto-ñandú"), "proyecto...");
        assert_eq!(project_id_prefix("ññññññññññ"), "ññññññññ...");
    }

    #[test]
    fn record_serializes_without_empty_error() {
        let record = TelemetryRecord::new(actions::GENERATE_DOCUMENT, "123456789", true, 42);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["project_id_prefix"], "12345678...");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn tracing_sink_accepts_records_without_recorder() {
        let sink = TracingSink::new();
        sink.record(TelemetryRecord::new(actions::SEND_APPROVAL, "1", false, 0).with_error("boom"));
    }
}
