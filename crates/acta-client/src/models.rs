//! Typed response bodies
//!
//! The backend is loose about field names (camelCase and snake_case both
//! appear), so most fields accept an alias and are optional.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Document format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// PDF
    #[default]
    Pdf,
    /// Word document
    Docx,
}

impl DocumentFormat {
    /// Query-string value
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown document format string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document format '{0}', expected pdf or docx")]
pub struct ParseFormatError(pub String);

impl FromStr for DocumentFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// `POST /extract-project-place/{id}` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Backend status message
    #[serde(default)]
    pub message: Option<String>,
    /// Full S3 location of the generated document
    #[serde(default, alias = "s3Location")]
    pub s3_location: Option<String>,
    /// Identifier of the generated document
    #[serde(default, alias = "documentId")]
    pub document_id: Option<String>,
    /// Bucket name, when the location is reported split
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object key, when the location is reported split
    #[serde(default)]
    pub key: Option<String>,
}

impl GenerateResponse {
    /// Document identifier, defaulting to the project id
    #[must_use]
    pub fn document_id_or(&self, project_id: &str) -> String {
        self.document_id
            .clone()
            .unwrap_or_else(|| project_id.to_string())
    }

    /// Storage location, assembled from bucket/key if needed
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.s3_location.clone().or_else(|| match (&self.bucket, &self.key) {
            (Some(bucket), Some(key)) => Some(format!("s3://{bucket}/{key}")),
            _ => None,
        })
    }
}

/// `GET /check-document/{id}` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Whether the document can be downloaded
    pub available: bool,
    /// Last modification time as reported by storage
    #[serde(default, alias = "lastModified")]
    pub last_modified: Option<String>,
    /// Size in bytes
    #[serde(default)]
    pub size: Option<u64>,
    /// Storage key
    #[serde(default, alias = "s3Key")]
    pub s3_key: Option<String>,
}

impl Availability {
    /// Document exists
    #[inline]
    #[must_use]
    pub fn present() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    /// Document does not exist yet
    #[inline]
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }
}

/// Where to fetch a generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadReference {
    /// Signed URL or redirect target
    pub url: String,
    /// Format of the document behind `url`
    pub format: DocumentFormat,
}

/// `GET /download-acta/{id}` JSON body, for deployments that do not redirect
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DownloadBody {
    #[serde(alias = "downloadUrl", alias = "download_url")]
    pub(crate) url: String,
}

/// `POST /send-approval-email` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    /// Backend status message
    #[serde(default)]
    pub message: Option<String>,
    /// Approval token embedded in the e-mail link
    #[serde(default)]
    pub token: Option<String>,
}

/// Project summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// Project identifier
    #[serde(alias = "projectId", alias = "id")]
    pub project_id: String,
    /// Display name
    #[serde(default, alias = "projectName", alias = "name")]
    pub project_name: String,
    /// Project manager
    #[serde(default)]
    pub pm: Option<String>,
    /// Project manager (legacy field)
    #[serde(default)]
    pub project_manager: Option<String>,
    /// Status label
    #[serde(default)]
    pub status: Option<String>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectSummary {
    /// Project manager from whichever field is populated
    #[must_use]
    pub fn manager(&self) -> Option<&str> {
        self.pm.as_deref().or(self.project_manager.as_deref())
    }
}

/// `GET /projects` body: either a bare list or wrapped in `projects`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProjectsPayload {
    List(Vec<ProjectSummary>),
    Wrapped { projects: Vec<ProjectSummary> },
}

impl ProjectsPayload {
    pub(crate) fn into_projects(self) -> Vec<ProjectSummary> {
        match self {
            Self::List(projects) | Self::Wrapped { projects } => projects,
        }
    }
}

/// Timeline entry of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Milestone
    #[serde(default)]
    pub hito: String,
    /// Activities
    #[serde(default, alias = "actividad")]
    pub actividades: String,
    /// Progress notes
    #[serde(default)]
    pub desarrollo: String,
    /// Date, as sent by the backend
    #[serde(default, alias = "fecha_crea")]
    pub fecha: String,
    /// Ordering key
    #[serde(default)]
    pub orden: Option<u32>,
}

/// Freshness of a project's acta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActaStatus {
    /// Up to date
    Current,
    /// Older than the latest project data
    Outdated,
    /// Never generated
    Missing,
    /// Value this client does not know
    #[serde(other)]
    Unknown,
}

/// Priority assigned by the metadata enricher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Value this client does not know
    #[serde(other)]
    Unknown,
}

/// Project as listed for a project manager
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PmProject {
    /// Project identifier
    pub project_id: String,
    /// Display name
    #[serde(default)]
    pub project_name: String,
    /// Manager e-mail
    #[serde(default)]
    pub pm_email: String,
    /// Status label
    #[serde(default)]
    pub project_status: Option<String>,
    /// Last update timestamp
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Whether an acta has been generated
    #[serde(default)]
    pub has_acta_document: Option<bool>,
    /// Last acta generation timestamp
    #[serde(default)]
    pub acta_last_generated: Option<String>,
    /// Days since last update
    #[serde(default)]
    pub days_since_update: Option<u32>,
    /// Acta freshness
    #[serde(default)]
    pub acta_status: Option<ActaStatus>,
    /// Priority
    #[serde(default)]
    pub priority_level: Option<PriorityLevel>,
}

/// Aggregate counts for a project manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmSummary {
    /// Projects with an acta
    #[serde(default)]
    pub with_acta: u32,
    /// Projects without an acta
    #[serde(default)]
    pub without_acta: u32,
    /// Projects updated recently
    #[serde(default)]
    pub recently_updated: u32,
}

/// `GET /pm-projects/{email}` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PmProjectsResponse {
    /// Manager e-mail the listing is for
    #[serde(default)]
    pub pm_email: String,
    /// Number of projects
    #[serde(default)]
    pub total_projects: u32,
    /// Projects
    #[serde(default)]
    pub projects: Vec<PmProject>,
    /// Aggregates
    #[serde(default)]
    pub summary: PmSummary,
}

/// `POST /bulk-generate-summaries` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummaryResult {
    /// Project ids summarized
    #[serde(default)]
    pub success: Vec<String>,
    /// Project ids that failed
    #[serde(default)]
    pub failed: Vec<String>,
    /// Projects attempted
    #[serde(default)]
    pub total: u32,
}

/// `GET /health` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// HTTP status of the probe
    pub http_status: u16,
    /// `status` field of the body, if it was JSON
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("PDF".parse::<DocumentFormat>().unwrap(), DocumentFormat::Pdf);
        assert_eq!("docx".parse::<DocumentFormat>().unwrap(), DocumentFormat::Docx);
        assert!("odt".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn generate_location_from_bucket_and_key() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"bucket":"acta-bucket","key":"acta/123.docx"}"#).unwrap();
        assert_eq!(response.location().as_deref(), Some("s3://acta-bucket/acta/123.docx"));
        assert_eq!(response.document_id_or("123"), "123");
    }

    #[test]
    fn availability_accepts_camel_case() {
        let parsed: Availability =
            serde_json::from_str(r#"{"available":true,"lastModified":"Tue, 01 Jul 2025"}"#).unwrap();
        assert!(parsed.available);
        assert_eq!(parsed.last_modified.as_deref(), Some("Tue, 01 Jul 2025"));
    }

    #[test]
    fn project_summary_keeps_unknown_fields() {
        let parsed: ProjectSummary = serde_json::from_str(
            r#"{"project_id":"1000","project_name":"Metro","project_manager":"Ana","budget":12}"#,
        )
        .unwrap();
        assert_eq!(parsed.manager(), Some("Ana"));
        assert_eq!(parsed.extra.get("budget"), Some(&serde_json::json!(12)));
    }

    #[test]
    fn projects_payload_accepts_both_shapes() {
        let bare: ProjectsPayload = serde_json::from_str(r#"[{"project_id":"1"}]"#).unwrap();
        let wrapped: ProjectsPayload =
            serde_json::from_str(r#"{"projects":[{"project_id":"1"},{"project_id":"2"}]}"#).unwrap();
        assert_eq!(bare.into_projects().len(), 1);
        assert_eq!(wrapped.into_projects().len(), 2);
    }

    #[test]
    fn pm_project_tolerates_unknown_enum_values() {
        let parsed: PmProject = serde_json::from_str(
            r#"{"project_id":"1","acta_status":"archived","priority_level":"high"}"#,
        )
        .unwrap();
        assert_eq!(parsed.acta_status, Some(ActaStatus::Unknown));
        assert_eq!(parsed.priority_level, Some(PriorityLevel::High));
    }

    #[test]
    fn timeline_accepts_legacy_names() {
        let parsed: TimelineEvent = serde_json::from_str(
            r#"{"hito":"Kickoff","actividad":"Reunion","desarrollo":"ok","orden":1,"fecha_crea":"2025-07-01"}"#,
        )
        .unwrap();
        assert_eq!(parsed.actividades, "Reunion");
        assert_eq!(parsed.fecha, "2025-07-01");
    }
}
