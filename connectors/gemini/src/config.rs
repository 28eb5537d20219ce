//! Configuration for Gemini connector

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Gemini API key
    pub api_key: String,
    /// Model to use (e.g., "gemini-3-flash-preview")
    pub model: String,
    /// API base URL
    pub api_base: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for generation (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries for transient failures
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each further attempt
    pub retry_backoff_ms: u64,
}

impl GeminiConfig {
    /// Create a new Gemini config with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "gemini-3-flash-preview".to_string(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_tokens: Some(2048),
            temperature: Some(0.2),
            timeout_ms: 15_000,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 1.0));
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set maximum retries and the initial backoff
    pub fn with_retries(mut self, max_retries: u32, retry_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    /// Longest a call can take when every attempt times out
    pub fn worst_case_duration(&self) -> Duration {
        let backoff = (0..self.max_retries)
            .map(|attempt| self.retry_backoff_ms.saturating_mul(1 << attempt.min(16)))
            .fold(0u64, u64::saturating_add);
        let attempts = u64::from(self.max_retries) + 1;
        Duration::from_millis(self.timeout_ms.saturating_mul(attempts).saturating_add(backoff))
    }

    /// Whether an API key has been provided
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::new("") // Empty API key - must be set by user
    }
}

// Keeps the key out of logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &if self.has_api_key() { "<redacted>" } else { "<unset>" })
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key() {
        let config = GeminiConfig::new("secret-key");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: GeminiConfig =
            serde_json::from_str(r#"{"api_key": "k", "max_retries": 0}"#).unwrap();
        assert_eq!(config.model, "gemini-3-flash-preview");
        assert_eq!(config.max_retries, 0);
        assert!(config.has_api_key());
    }

    #[test]
    fn test_worst_case_duration() {
        // three 15s attempts plus 500ms and 1s of backoff
        assert_eq!(GeminiConfig::default().worst_case_duration(), Duration::from_millis(46_500));

        let config = GeminiConfig::default().with_timeout(1_000).with_retries(0, 500);
        assert_eq!(config.worst_case_duration(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_temperature_clamped() {
        let config = GeminiConfig::default().with_temperature(3.0);
        assert_eq!(config.temperature, Some(1.0));
        assert!(!config.has_api_key());
    }
}
