//! Acta Core
//!
//! Document workflow on top of the authenticated Acta client.
//!
//! # Overview
//!
//! - **ActaConfig**: TOML configuration with `ACTA_*` environment overrides
//! - **WorkflowOrchestrator**: generate, check availability, download, with
//!   approval e-mails as a side branch
//! - **TelemetrySink**: per-action records (`tracing` + `metrics` by default)
//! - **Acta**: everything wired from one configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use acta_core::prelude::*;
//!
//! # async fn example() -> Result<(), ActaError> {
//! let acta = Acta::from_config(ActaConfig::load("acta.toml")?.with_env_overrides()?)?;
//! let mut state = WorkflowState::new("1000000049842296")?;
//!
//! match acta.orchestrator().run(&mut state, DocumentFormat::Pdf).await? {
//!     StepResult::Advanced(Stage::Done) => println!("{}", state.download().unwrap().url),
//!     StepResult::NotReady => println!("not ready yet"),
//!     other => println!("{other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod acta;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflow;

// Re-exports
pub use acta::Acta;
pub use config::{ActaConfig, IdentityConfig, DEFAULT_API_BASE_URL};
pub use error::{ActaError, ConfigError, WorkflowError};
pub use telemetry::{project_id_prefix, TelemetryRecord, TelemetrySink, TracingSink};
pub use workflow::{
    allowed_transitions, validate_transition, ApprovalReport, Stage, StepResult,
    WorkflowOrchestrator, WorkflowState, CANCELLED_CAUSE,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running document workflows
    pub use crate::{
        Acta, ActaConfig, ActaError, ApprovalReport, Stage, StepResult, WorkflowOrchestrator,
        WorkflowState,
    };
    pub use acta_client::{DocumentFormat, UserAction};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
