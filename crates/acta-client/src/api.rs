//! Typed Acta endpoints
//!
//! Each method issues exactly one [`ApiClient::call`] and decodes the body
//! into the endpoint's response type. The `Err` side is always a non-success
//! [`ApiOutcome`]; a success whose body breaks the contract is reported as a
//! server failure.

use crate::client::ApiClient;
use crate::models::{
    ApprovalResponse, Availability, BulkSummaryResult, DocumentFormat, DownloadBody,
    DownloadReference, GenerateResponse, HealthStatus, PmProjectsResponse, ProjectSummary,
    ProjectsPayload, TimelineEvent,
};
use crate::outcome::ApiOutcome;
use crate::request::ApiRequest;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

/// Pseudo e-mail that lists every project
pub const ADMIN_ALL_ACCESS: &str = "admin-all-access";

/// Request builders for every endpoint
pub mod endpoints {
    use super::{json, ApiRequest, DocumentFormat, ADMIN_ALL_ACCESS};

    /// `POST /extract-project-place/{id}`
    #[must_use]
    pub fn extract_project_place(project_id: &str) -> ApiRequest {
        ApiRequest::post(["extract-project-place", project_id]).with_body(json!({}))
    }

    /// `GET /check-document/{id}?format=`
    #[must_use]
    pub fn check_document(project_id: &str, format: DocumentFormat) -> ApiRequest {
        ApiRequest::get(["check-document", project_id]).with_query("format", format.as_str())
    }

    /// `GET /download-acta/{id}?format=`
    #[must_use]
    pub fn download_acta(project_id: &str, format: DocumentFormat) -> ApiRequest {
        ApiRequest::get(["download-acta", project_id]).with_query("format", format.as_str())
    }

    /// `POST /send-approval-email`
    #[must_use]
    pub fn send_approval_email(acta_id: &str, client_email: &str) -> ApiRequest {
        ApiRequest::post(["send-approval-email"])
            .with_body(json!({ "actaId": acta_id, "clientEmail": client_email }))
    }

    /// `GET /projects`
    #[must_use]
    pub fn projects() -> ApiRequest {
        ApiRequest::get(["projects"])
    }

    /// `GET /project-summary/{id}`
    #[must_use]
    pub fn project_summary(project_id: &str) -> ApiRequest {
        ApiRequest::get(["project-summary", project_id])
    }

    /// `GET /timeline/{id}`
    #[must_use]
    pub fn timeline(project_id: &str) -> ApiRequest {
        ApiRequest::get(["timeline", project_id])
    }

    /// `GET /pm-projects/{email}`, or `/pm-projects/all-projects` for admins
    #[must_use]
    pub fn pm_projects(pm_email: &str) -> ApiRequest {
        if pm_email == ADMIN_ALL_ACCESS {
            ApiRequest::get(["pm-projects", "all-projects"])
        } else {
            ApiRequest::get(["pm-projects", pm_email])
        }
    }

    /// `POST /bulk-generate-summaries`
    #[must_use]
    pub fn bulk_generate_summaries(pm_email: &str) -> ApiRequest {
        ApiRequest::post(["bulk-generate-summaries"]).with_body(json!({ "pm_email": pm_email }))
    }

    /// `GET /health`, unauthenticated
    #[must_use]
    pub fn health() -> ApiRequest {
        ApiRequest::get(["health"]).without_auth()
    }
}

/// Typed facade over [`ApiClient`]
#[derive(Debug, Clone)]
pub struct ActaApi {
    client: Arc<ApiClient>,
}

impl ActaApi {
    /// Create API facade
    #[inline]
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Underlying client
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Trigger document generation for a project
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn generate_document(&self, project_id: &str) -> Result<GenerateResponse, ApiOutcome> {
        let outcome = self
            .client
            .call(endpoints::extract_project_place(project_id))
            .await;
        decode_or_default(outcome)
    }

    /// Check whether the generated document exists
    ///
    /// A `404` means "not generated yet" and is reported as
    /// `Availability { available: false, .. }`, not as a failure. A success
    /// with an empty body means the document exists.
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn check_document(
        &self,
        project_id: &str,
        format: DocumentFormat,
    ) -> Result<Availability, ApiOutcome> {
        let outcome = self
            .client
            .call(endpoints::check_document(project_id, format))
            .await;

        match outcome {
            ApiOutcome::ClientFailure { status: 404, .. } => Ok(Availability::missing()),
            ApiOutcome::Success { ref body, .. } if body.trim().is_empty() => {
                Ok(Availability::present())
            }
            other => decode(other),
        }
    }

    /// Resolve the download reference for a generated document
    ///
    /// The endpoint normally answers `302` with the signed URL in `Location`;
    /// a JSON body carrying `url`/`downloadUrl` is accepted as well.
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn download_reference(
        &self,
        project_id: &str,
        format: DocumentFormat,
    ) -> Result<DownloadReference, ApiOutcome> {
        let outcome = self
            .client
            .call(endpoints::download_acta(project_id, format))
            .await;

        if let Some(url) = outcome.location() {
            return Ok(DownloadReference {
                url: url.to_string(),
                format,
            });
        }

        let body: DownloadBody = decode(outcome)?;
        Ok(DownloadReference {
            url: body.url,
            format,
        })
    }

    /// Ask the backend to e-mail an approval request for a document
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn send_approval_email(
        &self,
        acta_id: &str,
        client_email: &str,
    ) -> Result<ApprovalResponse, ApiOutcome> {
        let outcome = self
            .client
            .call(endpoints::send_approval_email(acta_id, client_email))
            .await;
        decode_or_default(outcome)
    }

    /// All projects visible to the caller
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn projects(&self) -> Result<Vec<ProjectSummary>, ApiOutcome> {
        let outcome = self.client.call(endpoints::projects()).await;
        decode::<ProjectsPayload>(outcome).map(ProjectsPayload::into_projects)
    }

    /// Summary of one project
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn project_summary(&self, project_id: &str) -> Result<ProjectSummary, ApiOutcome> {
        decode(self.client.call(endpoints::project_summary(project_id)).await)
    }

    /// Timeline of one project
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn timeline(&self, project_id: &str) -> Result<Vec<TimelineEvent>, ApiOutcome> {
        decode(self.client.call(endpoints::timeline(project_id)).await)
    }

    /// Projects managed by `pm_email` ([`ADMIN_ALL_ACCESS`] lists all)
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn pm_projects(&self, pm_email: &str) -> Result<PmProjectsResponse, ApiOutcome> {
        decode(self.client.call(endpoints::pm_projects(pm_email)).await)
    }

    /// Regenerate summaries for every project of a manager
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn bulk_generate_summaries(
        &self,
        pm_email: &str,
    ) -> Result<BulkSummaryResult, ApiOutcome> {
        decode(
            self.client
                .call(endpoints::bulk_generate_summaries(pm_email))
                .await,
        )
    }

    /// Liveness probe
    ///
    /// # Errors
    /// Returns the failed [`ApiOutcome`].
    pub async fn health(&self) -> Result<HealthStatus, ApiOutcome> {
        let outcome = self.client.call(endpoints::health()).await;
        match outcome {
            ApiOutcome::Success { status, ref body, .. } => {
                let reported = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(str::to_string));
                Ok(HealthStatus {
                    http_status: status,
                    status: reported,
                })
            }
            other => Err(other),
        }
    }
}

fn decode<T: DeserializeOwned>(outcome: ApiOutcome) -> Result<T, ApiOutcome> {
    if !outcome.is_success() {
        return Err(outcome);
    }
    match outcome.decode::<T>() {
        Ok(value) => Ok(value),
        Err(e) => Err(outcome.into_contract_violation(&e)),
    }
}

/// Like [`decode`], but an empty success body yields `T::default()`.
fn decode_or_default<T: DeserializeOwned + Default>(outcome: ApiOutcome) -> Result<T, ApiOutcome> {
    match outcome.body() {
        Some(body) if body.trim().is_empty() => Ok(T::default()),
        _ => decode(outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::endpoints;
    use crate::models::DocumentFormat;
    use crate::request::{BaseUrl, Method};
    use pretty_assertions::assert_eq;

    fn url(request: &crate::ApiRequest) -> String {
        request
            .url(&BaseUrl::parse("https://api.example.com/prod").unwrap())
            .to_string()
    }

    #[test]
    fn endpoint_paths_match_backend_contract() {
        assert_eq!(
            url(&endpoints::extract_project_place("123")),
            "https://api.example.com/prod/extract-project-place/123"
        );
        assert_eq!(
            url(&endpoints::check_document("123", DocumentFormat::Pdf)),
            "https://api.example.com/prod/check-document/123?format=pdf"
        );
        assert_eq!(
            url(&endpoints::download_acta("123", DocumentFormat::Docx)),
            "https://api.example.com/prod/download-acta/123?format=docx"
        );
        assert_eq!(
            url(&endpoints::send_approval_email("123", "client@example.com")),
            "https://api.example.com/prod/send-approval-email"
        );
        assert_eq!(url(&endpoints::projects()), "https://api.example.com/prod/projects");
        assert_eq!(
            url(&endpoints::pm_projects(super::ADMIN_ALL_ACCESS)),
            "https://api.example.com/prod/pm-projects/all-projects"
        );
    }

    #[test]
    fn only_health_is_unauthenticated() {
        assert!(!endpoints::health().requires_auth());
        assert!(endpoints::projects().requires_auth());
        assert!(endpoints::extract_project_place("1").requires_auth());
        assert!(endpoints::send_approval_email("1", "a@b.c").requires_auth());
    }

    #[test]
    fn approval_body_uses_backend_field_names() {
        let request = endpoints::send_approval_email("acta-9", "client@example.com");
        assert_eq!(request.method(), Method::Post);
        assert_eq!(
            request.body(),
            Some(&serde_json::json!({ "actaId": "acta-9", "clientEmail": "client@example.com" }))
        );
    }
}
