//! Listing video vetting

use crate::{extract::ValidatedJson, handle_core_error, ApiRejection, AppState};
use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    response::Json,
};
use jaga_core::prelude::*;
use serde_json::json;

/// `POST /sceptic/vet`
pub async fn vet(
    State(state): State<AppState>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LemonScoreRequest>,
) -> Result<Json<LemonReport>, ApiRejection> {
    let mut ctx = super::request_context(AnalysisMode::Sceptic, &method, &uri, &headers);
    ctx.operation_input = Some(json!({ "video_url": request.video_url }));

    let ctx = super::before_operation(&state, ctx).await?;

    match state.service.vet_car(request).await {
        Ok(report) => {
            super::after_operation(&state, ctx, None).await;
            Ok(Json(report))
        }
        Err(e) => {
            super::after_operation(&state, ctx, Some(&e)).await;
            Err(handle_core_error(e))
        }
    }
}
