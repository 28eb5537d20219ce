//! Wire models for the HTTP API beyond the core report types

use serde::Serialize;

/// API versioning information
#[derive(Debug, Clone, Serialize)]
pub struct ApiVersion {
    pub version: String,
    pub build: String,
    pub commit: Option<String>,
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build: if cfg!(debug_assertions) { "development" } else { "release" }.to_string(),
            commit: option_env!("GIT_COMMIT").map(|s| s.to_string()),
        }
    }
}

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: ApiVersion,
    /// Model backend in use
    pub model: String,
    pub timestamp: String,
}
