//! Health check handlers

use crate::{ApiRejection, ApiResponse, ApiVersion, AppState, HealthStatus};
use axum::{extract::State, http::StatusCode, response::Json};

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthStatus>>, ApiRejection> {
    match state.service.health_check().await {
        Ok(_) => {
            let health = HealthStatus {
                status: "healthy".to_string(),
                version: ApiVersion::default(),
                model: state.service.model_name().to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            Ok(Json(ApiResponse::success(health)))
        }
        Err(e) => {
            let error_msg = format!("Diagnostics service unhealthy: {}", e);
            Err((StatusCode::SERVICE_UNAVAILABLE, Json(ApiResponse::error(error_msg))))
        }
    }
}
