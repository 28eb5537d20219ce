//! Core traits defining the plugin interfaces for J-Jaga

use crate::errors::{CoreError, ModelError, PresentationError};
use crate::ingest::{MediaFrame, VideoSource};
use crate::types::{
    AnalysisMode, DiagnosticReport, DiagnosticRequest, GuardianReport, LemonReport,
    LemonScoreRequest,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A multimodal model backend able to run all three analyses
#[async_trait]
pub trait DiagnosticModel: Send + Sync {
    /// Short backend identifier, reported by health checks
    fn name(&self) -> &'static str;

    /// Diagnose an engine sound and cross-check the repair quote
    async fn analyze_engine(
        &self,
        request: &DiagnosticRequest,
    ) -> Result<DiagnosticReport, ModelError>;

    /// Score a used-car video for lemon risk
    async fn vet_listing(&self, source: &VideoSource) -> Result<LemonReport, ModelError>;

    /// Read an accident-scene frame and produce guidance
    async fn inspect_frame(&self, frame: &MediaFrame) -> Result<GuardianReport, ModelError>;

    /// Check that the backend is usable
    async fn health_check(&self) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Service interface that presentation adapters interact with
#[async_trait]
pub trait DiagnosticsService: Send + Sync {
    /// Engine-sound fraud detection
    async fn analyze_mechanic(
        &self,
        request: DiagnosticRequest,
    ) -> Result<DiagnosticReport, CoreError>;

    /// Video-based lemon scoring
    async fn vet_car(&self, request: LemonScoreRequest) -> Result<LemonReport, CoreError>;

    /// Accident-scene guidance for one uploaded frame
    async fn process_frame(&self, frame: MediaFrame) -> Result<GuardianReport, CoreError>;

    /// Name of the model backend in use
    fn model_name(&self) -> &'static str;

    /// Largest frame accepted by `process_frame`
    fn max_frame_bytes(&self) -> usize;

    /// Get service health status
    async fn health_check(&self) -> Result<(), CoreError>;
}

/// Trait for presentation adapters (network transport layers)
#[async_trait]
pub trait PresentationAdapter: Send + Sync {
    /// Start the presentation adapter with a reference to the core service
    async fn start(&self, service: Arc<dyn DiagnosticsService>) -> Result<(), PresentationError>;

    /// Stop the presentation adapter gracefully
    async fn stop(&self) -> Result<(), PresentationError>;
}

/// Trait for request processing pipeline plugins
#[async_trait]
pub trait PipelinePlugin: Send + Sync {
    /// A unique identifier for the plugin
    fn name(&self) -> &'static str;

    /// Executes the plugin's logic
    async fn call(&self, ctx: &mut RequestContext) -> PluginOutcome;
}

/// Outcome of a plugin's execution
#[derive(Debug)]
pub enum PluginOutcome {
    /// Continue to the next plugin or stage
    Continue,
    /// Stop the stage; in the pre-operation stage the request is rejected
    HaltWithError(Box<dyn std::error::Error + Send + Sync>),
}

/// Represents the shared context flowing through the pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub mode: Option<AnalysisMode>,
    pub method: String,
    pub path: String,
    /// Request headers with lowercase names; non-UTF-8 values are skipped
    pub headers: HashMap<String, String>,
    /// Summary of the operation input (never raw media)
    pub operation_input: Option<serde_json::Value>,
    pub attributes: HashMap<String, serde_json::Value>,
    pub start_time: std::time::Instant,
    pub error: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            mode: None,
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            operation_input: None,
            attributes: HashMap::new(),
            start_time: std::time::Instant::now(),
            error: None,
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn get_attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}
