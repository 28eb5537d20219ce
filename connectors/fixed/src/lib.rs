//! Fixed-response model backend.
//!
//! Answers every analysis with the same reference report, whatever the
//! input. Used as the default backend and in tests.

use async_trait::async_trait;
use jaga_core::prelude::*;
use tracing::debug;

/// [`DiagnosticModel`] that returns the reference reports
#[derive(Debug, Clone, Default)]
pub struct FixedModel;

impl FixedModel {
    pub fn new() -> Self {
        Self
    }

    /// Reference engine diagnosis
    pub fn diagnostic_report() -> DiagnosticReport {
        DiagnosticReport {
            issue: "Piston Slap / Worn Rings".to_string(),
            fraud_risk: FraudRisk::High,
            explanation: concat!(
                "Audio physics show 300Hz knock. ",
                "Quote suggests 'Air Filter', which is fraudulent."
            )
            .to_string(),
        }
    }

    /// Reference vetting report
    pub fn lemon_report() -> LemonReport {
        LemonReport {
            lemon_score: 72,
            flags: vec![
                LemonFlag::new("0:14", "Blue Smoke on Cold Start", Severity::High),
                LemonFlag::new("1:02", "Radiator Support Spray Paint Over", Severity::Medium),
            ],
        }
    }

    /// Reference accident-scene guidance
    pub fn guardian_report() -> GuardianReport {
        GuardianReport {
            instruction: "Walk closer to the Silver Perodua. Frame the plate.".to_string(),
            entities: vec![
                "Plate: WXA 1234".to_string(),
                "Road Tax: Valid Dec 2024".to_string(),
            ],
        }
    }
}

#[async_trait]
impl DiagnosticModel for FixedModel {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn analyze_engine(
        &self,
        request: &DiagnosticRequest,
    ) -> Result<DiagnosticReport, ModelError> {
        debug!("Fixed diagnosis for {} chars of description", request.audio_description.len());
        Ok(Self::diagnostic_report())
    }

    async fn vet_listing(&self, source: &VideoSource) -> Result<LemonReport, ModelError> {
        debug!("Fixed vetting for {}", source);
        Ok(Self::lemon_report())
    }

    async fn inspect_frame(&self, frame: &MediaFrame) -> Result<GuardianReport, ModelError> {
        debug!("Fixed guidance for {} byte frame", frame.len());
        Ok(Self::guardian_report())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jaga_core::ingest::normalize_frame;
    use serde_json::json;

    #[tokio::test]
    async fn test_diagnosis_ignores_input() {
        let model = FixedModel::new();
        let report = model
            .analyze_engine(&DiagnosticRequest {
                audio_description: "anything".to_string(),
                quote_data: Some("Brake pads".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({
                "issue": "Piston Slap / Worn Rings",
                "fraud_risk": "HIGH",
                "explanation": concat!(
                    "Audio physics show 300Hz knock. ",
                    "Quote suggests 'Air Filter', which is fraudulent."
                )
            })
        );
    }

    #[tokio::test]
    async fn test_vetting_literal() {
        let report = FixedModel::new()
            .vet_listing(&VideoSource::parse("not a url"))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(report).unwrap(),
            json!({
                "lemon_score": 72,
                "flags": [
                    {"ts": "0:14", "issue": "Blue Smoke on Cold Start", "severity": "high"},
                    {
                        "ts": "1:02",
                        "issue": "Radiator Support Spray Paint Over",
                        "severity": "medium"
                    }
                ]
            })
        );
    }

    #[tokio::test]
    async fn test_guidance_literal() {
        let frame = normalize_frame(None, None, b"\x00\x01garbage".to_vec(), 1024).unwrap();
        let report = FixedModel::new().inspect_frame(&frame).await.unwrap();

        assert_eq!(report.instruction, "Walk closer to the Silver Perodua. Frame the plate.");
        assert_eq!(report.entities, vec!["Plate: WXA 1234", "Road Tax: Valid Dec 2024"]);
    }

    #[test]
    fn test_health_check_passes() {
        let model = FixedModel::new();
        assert_eq!(model.name(), "fixed");
        assert!(tokio_test::block_on(model.health_check()).is_ok());
    }
}
