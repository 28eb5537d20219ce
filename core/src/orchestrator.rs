//! AI orchestration: normalizes requests, invokes the model backend under a
//! deadline, and formats the model output into the public report shapes.

use crate::errors::{CoreError, ModelError};
use crate::ingest::{self, MediaFrame, VideoSource};
use crate::traits::{DiagnosticModel, DiagnosticsService};
use crate::types::{
    DiagnosticReport, DiagnosticRequest, GuardianReport, LemonReport, LemonScoreRequest,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound for a single model call, retries included. Keep it below
    /// the HTTP request timeout so a slow model surfaces as its own error.
    pub model_timeout: Duration,
    /// Largest accepted frame upload in bytes
    pub max_frame_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(50),
            max_frame_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Default [`DiagnosticsService`] over any [`DiagnosticModel`]
pub struct Orchestrator {
    model: Arc<dyn DiagnosticModel>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn DiagnosticModel>, config: OrchestratorConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, ModelError>
    where
        F: Future<Output = Result<T, ModelError>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.config.model_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} via {} exceeded {:?}",
                    operation,
                    self.model.name(),
                    self.config.model_timeout
                );
                Err(ModelError::Timeout)
            }
        };
        debug!("{} via {} took {:?}", operation, self.model.name(), start.elapsed());
        result
    }
}

/// Check the text fields of a diagnosis
fn format_diagnostic(mut report: DiagnosticReport) -> Result<DiagnosticReport, ModelError> {
    report.issue = report.issue.trim().to_string();
    report.explanation = report.explanation.trim().to_string();
    if report.issue.is_empty() {
        return Err(ModelError::SchemaValidation("Diagnosis has an empty issue".to_string()));
    }
    Ok(report)
}

/// Clamp the score and tidy the flags of a vetting report
fn format_lemon(mut report: LemonReport) -> LemonReport {
    report.lemon_score = report.lemon_score.min(LemonReport::MAX_SCORE);
    for flag in &mut report.flags {
        flag.ts = flag.ts.trim().to_string();
        flag.issue = flag.issue.trim().to_string();
    }
    report.flags.retain(|flag| !flag.issue.is_empty());
    report
}

/// Require an instruction and drop blank entities
fn format_guardian(mut report: GuardianReport) -> Result<GuardianReport, ModelError> {
    report.instruction = report.instruction.trim().to_string();
    if report.instruction.is_empty() {
        return Err(ModelError::SchemaValidation("Guidance has an empty instruction".to_string()));
    }
    report.entities = report
        .entities
        .into_iter()
        .map(|entity| entity.trim().to_string())
        .filter(|entity| !entity.is_empty())
        .collect();
    Ok(report)
}

#[async_trait]
impl DiagnosticsService for Orchestrator {
    async fn analyze_mechanic(
        &self,
        request: DiagnosticRequest,
    ) -> Result<DiagnosticReport, CoreError> {
        let request = ingest::normalize_diagnostic(request);
        debug!(
            "Mechanic analysis: {} chars of description, quote present: {}",
            request.audio_description.len(),
            request.quote_data.is_some()
        );

        let report = self
            .bounded("Mechanic analysis", self.model.analyze_engine(&request))
            .await?;
        let report = format_diagnostic(report)?;

        info!("Mechanic analysis found '{}' (fraud risk {:?})", report.issue, report.fraud_risk);
        Ok(report)
    }

    async fn vet_car(&self, request: LemonScoreRequest) -> Result<LemonReport, CoreError> {
        let source = VideoSource::parse(&request.video_url);
        if !source.is_remote() {
            debug!("Vetting non-URL video reference '{}'", source);
        }

        let report = self
            .bounded("Sceptic vetting", self.model.vet_listing(&source))
            .await?;
        let report = format_lemon(report);

        info!("Sceptic vetting scored {} with {} flags", report.lemon_score, report.flags.len());
        Ok(report)
    }

    async fn process_frame(&self, frame: MediaFrame) -> Result<GuardianReport, CoreError> {
        if frame.len() > self.config.max_frame_bytes {
            return Err(crate::errors::IngestError::PayloadTooLarge {
                size: frame.len(),
                limit: self.config.max_frame_bytes,
            }
            .into());
        }

        let report = self
            .bounded("Guardian frame", self.model.inspect_frame(&frame))
            .await?;
        let report = format_guardian(report)?;

        info!(
            "Guardian frame ({} bytes, {}) produced {} entities",
            frame.len(),
            frame.mime_type,
            report.entities.len()
        );
        Ok(report)
    }

    fn model_name(&self) -> &'static str {
        self.model.name()
    }

    fn max_frame_bytes(&self) -> usize {
        self.config.max_frame_bytes
    }

    async fn health_check(&self) -> Result<(), CoreError> {
        self.bounded("Health check", self.model.health_check()).await?;
        Ok(())
    }
}
