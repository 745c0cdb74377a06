//! Acta Client
//!
//! Authenticated, retrying client for the Acta REST API.
//!
//! # Overview
//!
//! - **ApiRequest**: immutable description of one call
//! - **Transport**: sends a request (`reqwest` in production, scripted in tests)
//! - **ApiOutcome**: classified result (success, auth, network, server, client)
//! - **ApiClient**: attaches the bearer token and retries network failures once
//!   after a forced token refresh
//! - **ActaApi**: typed endpoints on top of the client
//!
//! # Example
//!
//! ```rust,ignore
//! use acta_client::{ActaApi, ApiClient, ReqwestTransport};
//! use std::sync::Arc;
//!
//! # async fn example(tokens: Arc<acta_auth::TokenProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ReqwestTransport::new(std::time::Duration::from_secs(30))?);
//! let client = ApiClient::from_base_url("https://api.example.com/prod", transport, tokens)?;
//! let api = ActaApi::new(Arc::new(client));
//!
//! match api.projects().await {
//!     Ok(projects) => println!("{} projects", projects.len()),
//!     Err(outcome) => println!("{}", outcome.message()),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod outcome;
pub mod request;
pub mod transport;

// Re-exports
pub use api::{endpoints, ActaApi, ADMIN_ALL_ACCESS};
pub use client::{ApiClient, MAX_ATTEMPTS};
pub use error::{ClientError, DecodeError};
pub use models::{
    ActaStatus, ApprovalResponse, Availability, BulkSummaryResult, DocumentFormat,
    DownloadReference, GenerateResponse, HealthStatus, ParseFormatError, PmProject,
    PmProjectsResponse, PmSummary, PriorityLevel, ProjectSummary, TimelineEvent,
};
pub use outcome::{classify, ApiOutcome, OutcomeKind, UserAction};
pub use request::{ApiRequest, BaseUrl, Method};
pub use transport::{
    HttpRequest, RawResponse, ReqwestTransport, Transport, TransportError, DEFAULT_TIMEOUT,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for API calls
    pub use crate::{
        ActaApi, ApiClient, ApiOutcome, ApiRequest, DocumentFormat, OutcomeKind, Transport,
        UserAction,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
