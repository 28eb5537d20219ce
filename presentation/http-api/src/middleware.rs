//! Middleware for the HTTP API

use crate::ApiResponse;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Request logging middleware
pub async fn request_logging(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start_time = Instant::now();

    debug!("Incoming request: {} {}", method, uri);

    let response = next.run(request).await;

    let duration = start_time.elapsed();
    let status = response.status();

    if status.is_success() {
        info!("{} {} - {} ({:?})", method, uri, status, duration);
    } else {
        warn!("{} {} - {} ({:?})", method, uri, status, duration);
    }

    response
}

/// Request timeout middleware
pub async fn request_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request timed out after {:?}", limit);
            (
                StatusCode::REQUEST_TIMEOUT,
                Json(ApiResponse::error(format!("Request timed out after {:?}", limit))),
            )
                .into_response()
        }
    }
}
