//! Error types for J-Jaga core operations

use thiserror::Error;

/// Main error type for J-Jaga core operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Model backend error: {0}")]
    Model(#[from] ModelError),

    #[error("Media ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Errors related to request processing pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A pre-operation plugin rejected the request
    #[error("Pipeline halted: {0}")]
    PipelineHalted(String),
}

/// Errors raised while validating and normalizing uploaded media
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
}

/// Errors related to model backend operations
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error from model provider: {0}")]
    ApiError(String),

    #[error("Model provider rate limit reached")]
    RateLimited,

    #[error("Model provider unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout during model call")]
    Timeout,

    #[error("Failed to parse model response: {0}")]
    ResponseParseError(String),

    #[error("Model response failed schema validation: {0}")]
    SchemaValidation(String),
}

impl ModelError {
    /// Whether a retry of the same call might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ModelError::NetworkError(_)
                | ModelError::RateLimited
                | ModelError::Unavailable(_)
                | ModelError::Timeout
        )
    }
}

/// Errors related to presentation adapters
#[derive(Error, Debug)]
pub enum PresentationError {
    #[error("Server startup failed: {0}")]
    StartupFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_converts_into_core_error() {
        let err: CoreError = ModelError::Timeout.into();
        assert!(matches!(err, CoreError::Model(ModelError::Timeout)));
        assert_eq!(err.to_string(), "Model backend error: Timeout during model call");
    }

    #[test]
    fn test_payload_too_large_message() {
        let err = IngestError::PayloadTooLarge { size: 30, limit: 10 };
        assert_eq!(err.to_string(), "Payload of 30 bytes exceeds the 10 byte limit");
    }

    #[test]
    fn test_pipeline_halt_message() {
        let err: CoreError =
            PipelineError::PipelineHalted("No analysis mode serves /x".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Pipeline error: Pipeline halted: No analysis mode serves /x"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(ModelError::RateLimited.is_transient());
        assert!(ModelError::NetworkError("reset".to_string()).is_transient());
        assert!(!ModelError::SchemaValidation("bad".to_string()).is_transient());
    }
}
