//! HTTP presentation layer for the J-Jaga diagnostics gateway
//!
//! Serves the three analysis routes (`/mechanic/analyze`, `/sceptic/vet`,
//! `/guardian/frame`) plus health checks over axum, delegating the work to a
//! [`DiagnosticsService`].

use async_trait::async_trait;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use jaga_core::errors::PresentationError;
use jaga_core::pipeline::PipelineRunner;
use jaga_core::prelude::*;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

mod extract;
mod handlers;
mod middleware;
mod models;

pub use extract::ValidatedJson;
pub use models::*;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Server bind address
    pub bind_address: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Request timeout in seconds; must exceed the model timeout
    pub request_timeout: u64,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            enable_cors: true,
            request_timeout: 60,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// HTTP presentation adapter
pub struct HttpApi {
    config: HttpApiConfig,
    pipeline: Arc<PipelineRunner>,
    shutdown: Arc<Notify>,
}

impl HttpApi {
    /// Create a new HTTP API with the built-in pipeline plugins
    pub fn new(config: HttpApiConfig) -> Self {
        Self::new_with_pipeline(config, PipelineRunner::with_default_plugins())
    }

    /// Create a new HTTP API with custom pipeline
    pub fn new_with_pipeline(config: HttpApiConfig, pipeline: PipelineRunner) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn config(&self) -> &HttpApiConfig {
        &self.config
    }

    /// Build the Axum router with all routes
    pub fn router(&self, service: Arc<dyn DiagnosticsService>) -> Router {
        let app_state = AppState {
            service,
            pipeline: self.pipeline.clone(),
        };

        let mut router = Router::new()
            // Health check
            .route("/health", get(handlers::health::health_check))
            .route("/v1/health", get(handlers::health::health_check))

            // Analysis pipelines
            .route(AnalysisMode::Mechanic.route(), post(handlers::mechanic::analyze))
            .route(AnalysisMode::Sceptic.route(), post(handlers::sceptic::vet))
            .route(AnalysisMode::Guardian.route(), post(handlers::guardian::process_frame))

            .with_state(app_state)
            .layer(DefaultBodyLimit::max(self.config.max_upload_bytes))
            .layer(axum::middleware::from_fn_with_state(
                Duration::from_secs(self.config.request_timeout),
                middleware::request_timeout,
            ))
            .layer(axum::middleware::from_fn(middleware::request_logging));

        if self.config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
    }
}

#[async_trait]
impl PresentationAdapter for HttpApi {
    async fn start(
        &self,
        service: Arc<dyn DiagnosticsService>,
    ) -> Result<(), PresentationError> {
        info!("Starting HTTP API on {}", self.config.bind_address);

        let router = self.router(service);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address)
            .await
            .map_err(|e| {
                PresentationError::StartupFailed(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_address, e
                ))
            })?;

        info!("HTTP API listening on {}", self.config.bind_address);

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await
            .map_err(|e| PresentationError::StartupFailed(format!("Server error: {}", e)))?;

        info!("HTTP API stopped");
        Ok(())
    }

    async fn stop(&self) -> Result<(), PresentationError> {
        info!("Stopping HTTP API");
        // Stores a permit when the server is not yet waiting.
        self.shutdown.notify_one();
        Ok(())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn DiagnosticsService>,
    pub pipeline: Arc<PipelineRunner>,
}

/// Standard API response wrapper, used for health checks and errors
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error half of every handler result
pub type ApiRejection = (StatusCode, Json<ApiResponse<()>>);

/// Convert core errors to HTTP status codes and responses
pub fn handle_core_error(error: CoreError) -> ApiRejection {
    let (status, message) = match error {
        CoreError::Ingest(IngestError::PayloadTooLarge { size, limit }) => (
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Upload of {} bytes exceeds the {} byte limit", size, limit),
        ),
        CoreError::Ingest(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        CoreError::Model(ModelError::Timeout) => {
            (StatusCode::GATEWAY_TIMEOUT, "Model request timeout".to_string())
        }
        CoreError::Model(ModelError::RateLimited) => {
            (StatusCode::TOO_MANY_REQUESTS, "Model rate limit reached".to_string())
        }
        CoreError::Model(ModelError::Unavailable(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "Model service unavailable".to_string())
        }
        CoreError::Model(ModelError::ConfigError(msg)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Model backend misconfigured: {}", msg),
        ),
        CoreError::Model(_) => (StatusCode::BAD_GATEWAY, "Model service error".to_string()),
        CoreError::Pipeline(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        CoreError::Configuration(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {}", msg),
        ),
    };

    if status.is_server_error() {
        error!("API error: {} - {}", status, message);
    } else {
        warn!("API error: {} - {}", status, message);
    }
    (status, Json(ApiResponse::error(message)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = HttpApiConfig::default();
        assert_eq!(config.bind_address.port(), 8000);
        assert!(config.enable_cors);
        assert_eq!(config.request_timeout, 60);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert_eq!(response.data, Some("test data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response = ApiResponse::<()>::error("test error");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("test error".to_string()));
    }

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::Model(ModelError::Timeout), StatusCode::GATEWAY_TIMEOUT),
            (CoreError::Model(ModelError::RateLimited), StatusCode::TOO_MANY_REQUESTS),
            (CoreError::Model(ModelError::ApiError("x".to_string())), StatusCode::BAD_GATEWAY),
            (
                CoreError::Ingest(IngestError::PayloadTooLarge { size: 2, limit: 1 }),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                CoreError::Ingest(IngestError::MissingField("file".to_string())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CoreError::Model(ModelError::Unavailable("503".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CoreError::Model(ModelError::ConfigError("no key".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::Pipeline(PipelineError::PipelineHalted("rejected".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::Configuration("bad".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            let (status, Json(body)) = handle_core_error(error);
            assert_eq!(status, expected);
            assert!(!body.success);
        }
    }

    #[tokio::test]
    async fn test_stop_before_start_does_not_block() {
        let api = HttpApi::new(HttpApiConfig::default());
        assert!(api.stop().await.is_ok());
    }
}
