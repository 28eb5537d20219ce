//! Engine sound diagnostics

use crate::{extract::ValidatedJson, handle_core_error, ApiRejection, AppState};
use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    response::Json,
};
use jaga_core::prelude::*;
use serde_json::json;

/// `POST /mechanic/analyze`
pub async fn analyze(
    State(state): State<AppState>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<DiagnosticRequest>,
) -> Result<Json<DiagnosticReport>, ApiRejection> {
    let mut ctx = super::request_context(AnalysisMode::Mechanic, &method, &uri, &headers);
    ctx.operation_input = Some(json!({
        "audio_description_chars": request.audio_description.chars().count(),
        "has_quote": request.quote_data.is_some(),
    }));

    let ctx = super::before_operation(&state, ctx).await?;

    match state.service.analyze_mechanic(request).await {
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
