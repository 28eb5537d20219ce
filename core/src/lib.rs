//! # J-Jaga Core
//!
//! Core types, traits, and orchestration for the J-Jaga diagnostics gateway.
//! Model backends implement [`DiagnosticModel`]; presentation layers talk to
//! a [`DiagnosticsService`], normally the [`Orchestrator`].

pub mod types;
pub mod traits;
pub mod errors;
pub mod ingest;
pub mod prompts;
pub mod orchestrator;

// Re-export commonly used types and traits
pub use types::{
    AnalysisMode, DiagnosticReport, DiagnosticRequest, GuardianReport, LemonReport,
    LemonScoreRequest,
};
pub use traits::{
    DiagnosticModel, DiagnosticsService, PipelinePlugin, PluginOutcome, PresentationAdapter,
    RequestContext,
};
pub use errors::{CoreError, IngestError, ModelError};
pub use orchestrator::{Orchestrator, OrchestratorConfig};

pub mod pipeline;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::types::*;
    pub use crate::traits::*;
    pub use crate::errors::*;
    pub use crate::ingest::{ImageFormat, MediaFrame, VideoSource};
    pub use crate::pipeline::*;
    pub use async_trait::async_trait;
    pub use uuid::Uuid;
    pub use chrono::{DateTime, Utc};
}
