//! Gemini connector for J-Jaga diagnostics

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use jaga_core::prelude::*;
use jaga_core::prompts;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

mod config;
mod models;

pub use config::GeminiConfig;
use models::*;

/// Lemon report as the model writes it; the score may be fractional or out of range
#[derive(Debug, Deserialize)]
struct RawLemonReport {
    #[serde(alias = "lemonScore")]
    lemon_score: f64,
    #[serde(default)]
    flags: Vec<LemonFlag>,
}

/// Gemini implementation of DiagnosticModel
pub struct GeminiConnector {
    client: Client,
    config: GeminiConfig,
}

impl GeminiConnector {
    /// Create a new Gemini connector
    pub fn new(config: GeminiConfig) -> Result<Self, ModelError> {
        if !config.has_api_key() {
            return Err(ModelError::ConfigError("Gemini API key is not set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ModelError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Get the generateContent URL for the configured model
    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Build a JSON-mode request for one analysis mode
    fn build_request(&self, mode: AnalysisMode, parts: Vec<Part>) -> ContentRequest {
        ContentRequest {
            contents: vec![Content::new_user(parts)],
            system_instruction: Some(Content::new_system(prompts::system_instruction(mode))),
            generation_config: Some(GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
                response_mime_type: Some("application/json".to_string()),
            }),
        }
    }

    /// Send a request, retrying transient failures with exponential backoff
    async fn generate(&self, request: &ContentRequest) -> Result<String, ModelError> {
        let mut attempt = 0;
        loop {
            match self.send_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let factor = 1u64 << attempt.min(16);
                    let backoff =
                        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(factor));
                    attempt += 1;
                    warn!(
                        "Gemini call failed ({}), retry {}/{} in {:?}",
                        e, attempt, self.config.max_retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once(&self, request: &ContentRequest) -> Result<String, ModelError> {
        let start_time = Instant::now();

        let response = self
            .client
            .post(self.api_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::NetworkError(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = match serde_json::from_str::<GeminiError>(&error_text) {
                Ok(body) => {
                    format!("{} {}: {}", body.error.code, body.error.status, body.error.message)
                }
                Err(_) => error_text,
            };
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited,
                s if s.is_server_error() => {
                    ModelError::Unavailable(format!("Gemini API error {}: {}", s, message))
                }
                s => ModelError::ApiError(format!("Gemini API error {}: {}", s, message)),
            });
        }

        let content_response: ContentResponse = response
            .json()
            .await
            .map_err(|e| {
                ModelError::ResponseParseError(format!("Failed to parse response: {}", e))
            })?;

        if let Some(reason) = content_response
            .prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(ModelError::ApiError(format!("Prompt blocked by Gemini: {}", reason)));
        }

        let text = content_response.text();
        if text.trim().is_empty() {
            let finish_reason = content_response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("unknown");
            return Err(ModelError::ResponseParseError(format!(
                "No content in response (finish reason: {})",
                finish_reason
            )));
        }

        if let Some(usage) = &content_response.usage_metadata {
            debug!(
                "Gemini {} used {} prompt + {} output tokens ({} total) in {}ms",
                self.config.model,
                usage.prompt_token_count,
                usage.candidates_token_count,
                usage.total_token_count,
                start_time.elapsed().as_millis()
            );
        }

        Ok(text)
    }

    /// Parse a JSON reply, tolerating markdown code fences
    fn parse_report<T: DeserializeOwned>(&self, content: &str) -> Result<T, ModelError> {
        let cleaned_content = content
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        debug!("Parsing model response: {}", cleaned_content);

        serde_json::from_str(cleaned_content).map_err(|e| {
            error!("Failed to parse model response: {}", e);
            ModelError::SchemaValidation(format!(
                "Failed to parse JSON: {}. Content: '{}'",
                e, cleaned_content
            ))
        })
    }
}

#[async_trait]
impl DiagnosticModel for GeminiConnector {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze_engine(
        &self,
        request: &DiagnosticRequest,
    ) -> Result<DiagnosticReport, ModelError> {
        let start_time = Instant::now();
        let content_request = self.build_request(
            AnalysisMode::Mechanic,
            vec![Part::text(prompts::mechanic_prompt(request))],
        );

        let text = self.generate(&content_request).await?;
        let report: DiagnosticReport = self.parse_report(&text)?;

        info!(
            "Gemini mechanic analysis finished in {}ms",
            start_time.elapsed().as_millis()
        );
        Ok(report)
    }

    async fn vet_listing(&self, source: &VideoSource) -> Result<LemonReport, ModelError> {
        let start_time = Instant::now();
        let content_request = self.build_request(
            AnalysisMode::Sceptic,
            vec![Part::text(prompts::sceptic_prompt(source))],
        );

        let text = self.generate(&content_request).await?;
        let raw: RawLemonReport = self.parse_report(&text)?;
        let report = LemonReport {
            lemon_score: LemonReport::clamp_score(raw.lemon_score),
            flags: raw.flags,
        };

        info!(
            "Gemini sceptic vetting finished in {}ms",
            start_time.elapsed().as_millis()
        );
        Ok(report)
    }

    async fn inspect_frame(&self, frame: &MediaFrame) -> Result<GuardianReport, ModelError> {
        let start_time = Instant::now();

        let mut parts = Vec::with_capacity(2);
        if frame.is_image() && !frame.is_empty() {
            parts.push(Part::inline(frame.mime_type.clone(), STANDARD.encode(&frame.data)));
        }
        parts.push(Part::text(prompts::guardian_prompt(frame)));

        let content_request = self.build_request(AnalysisMode::Guardian, parts);
        let text = self.generate(&content_request).await?;
        let report: GuardianReport = self.parse_report(&text)?;

        info!(
            "Gemini guardian frame ({} bytes) finished in {}ms",
            frame.len(),
            start_time.elapsed().as_millis()
        );
        Ok(report)
    }

    async fn health_check(&self) -> Result<(), ModelError> {
        if !self.config.has_api_key() {
            return Err(ModelError::ConfigError("Gemini API key is not set".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jaga_core::ingest::normalize_frame;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-3-flash-preview:generateContent";

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 120,
                "candidatesTokenCount": 40,
                "totalTokenCount": 160
            }
        })
    }

    fn connector(server: &MockServer) -> GeminiConnector {
        let config = GeminiConfig::new("test-key")
            .with_api_base(server.uri())
            .with_retries(2, 1);
        GeminiConnector::new(config).unwrap()
    }

    async fn sent_bodies(server: &MockServer) -> Vec<Value> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| serde_json::from_slice(&request.body).unwrap())
            .collect()
    }

    #[test]
    fn test_connector_requires_key() {
        assert!(GeminiConnector::new(GeminiConfig::default()).is_err());
        assert!(GeminiConnector::new(GeminiConfig::new("test-key")).is_ok());
    }

    #[test]
    fn test_api_url() {
        let config = GeminiConfig::new("k").with_api_base("http://host/v1beta/");
        let connector = GeminiConnector::new(config).unwrap();
        assert_eq!(
            connector.api_url(),
            "http://host/v1beta/models/gemini-3-flash-preview:generateContent"
        );
    }

    #[test]
    fn test_parse_fenced_response() {
        let connector = GeminiConnector::new(GeminiConfig::new("k")).unwrap();
        let fenced = concat!(
            "```json\n",
            "{\"instruction\": \"Hold steady\", \"entities\": [\"Plate: B 1\"]}",
            "\n```"
        );

        let report: GuardianReport = connector.parse_report(fenced).unwrap();
        assert_eq!(report.instruction, "Hold steady");
        assert_eq!(report.entities, vec!["Plate: B 1"]);

        let invalid: Result<GuardianReport, _> = connector.parse_report("not json");
        assert!(matches!(invalid, Err(ModelError::SchemaValidation(_))));
    }

    #[tokio::test]
    async fn test_analyze_engine_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"issue": "Worn Rings", "fraudRisk": "high", "explanation": "Knock at 300Hz"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let report = connector(&server)
            .analyze_engine(&DiagnosticRequest {
                audio_description: "metallic knock".to_string(),
                quote_data: Some("Air filter".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(report.issue, "Worn Rings");
        assert_eq!(report.fraud_risk, FraudRisk::High);

        let bodies = sent_bodies(&server).await;
        let body = &bodies[0];
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
        assert!(system.starts_with(prompts::MECHANIC_ROLE));
        let user = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(user.contains("metallic knock"));
        assert!(user.contains("Air filter"));
    }

    #[tokio::test]
    async fn test_inspect_frame_sends_inline_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"instruction": "Frame the plate.", "entities": ["Plate: WXA 1234"]}"#,
            )))
            .mount(&server)
            .await;

        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let frame = normalize_frame(Some("scene.jpg".to_string()), None, bytes, 1024).unwrap();
        let report = connector(&server).inspect_frame(&frame).await.unwrap();
        assert_eq!(report.instruction, "Frame the plate.");

        let bodies = sent_bodies(&server).await;
        let body = &bodies[0];
        let inline = &body["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(inline["mimeType"], "image/jpeg");
        assert_eq!(inline["data"], STANDARD.encode([0xFFu8, 0xD8, 0xFF, 0xE0]));
    }

    #[tokio::test]
    async fn test_vet_listing_clamps_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"lemon_score": 131.6,
                    "flags": [{"timestamp": "0:14", "issue": "Blue Smoke", "severity": "HIGH"}]}"#,
            )))
            .mount(&server)
            .await;

        let report = connector(&server)
            .vet_listing(&VideoSource::parse("https://example.com/car.mp4"))
            .await
            .unwrap();

        assert_eq!(report.lemon_score, 100);
        assert_eq!(report.flags, vec![LemonFlag::new("0:14", "Blue Smoke", Severity::High)]);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                r#"{"lemon_score": 10, "flags": []}"#,
            )))
            .mount(&server)
            .await;

        let report = connector(&server)
            .vet_listing(&VideoSource::parse("listing-1"))
            .await
            .unwrap();

        assert_eq!(report.lemon_score, 10);
        assert_eq!(sent_bodies(&server).await.len(), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = connector(&server)
            .vet_listing(&VideoSource::parse("listing-1"))
            .await;

        match result {
            Err(ModelError::ApiError(message)) => assert!(message.contains("API key not valid")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let result = connector(&server)
            .analyze_engine(&DiagnosticRequest {
                audio_description: "knock".to_string(),
                quote_data: None,
            })
            .await;

        assert!(matches!(result, Err(ModelError::RateLimited)));
    }

    #[tokio::test]
    async fn test_empty_candidates_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let frame = normalize_frame(None, None, Vec::new(), 1024).unwrap();
        let result = connector(&server).inspect_frame(&frame).await;
        assert!(matches!(result, Err(ModelError::ResponseParseError(_))));
    }
}
