//! HTTP request handlers

pub mod guardian;
pub mod health;
pub mod mechanic;
pub mod sceptic;

use crate::{handle_core_error, ApiRejection, AppState};
use axum::extract::OriginalUri;
use axum::http::{HeaderMap, Method};
use jaga_core::prelude::*;

/// Pipeline context for an analysis request, keyed on the path the client
/// actually called so nested mounts are visible to the plugins.
pub(crate) fn request_context(
    mode: AnalysisMode,
    method: &Method,
    uri: &OriginalUri,
    headers: &HeaderMap,
) -> RequestContext {
    let mut ctx = RequestContext::new(method.as_str(), uri.0.path());
    ctx.mode = Some(mode);
    ctx.headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    ctx
}

/// Run the pre-operation plugins; a rejection turns into `400`.
pub(crate) async fn before_operation(
    state: &AppState,
    ctx: RequestContext,
) -> Result<RequestContext, ApiRejection> {
    state.pipeline.before_operation(ctx).await.map_err(handle_core_error)
}

/// Run the post-operation plugins. They never change the response that was
/// already computed.
pub(crate) async fn after_operation(
    state: &AppState,
    mut ctx: RequestContext,
    outcome: Option<&CoreError>,
) {
    if let Some(e) = outcome {
        ctx.error = Some(e.to_string());
    }

    state.pipeline.after_operation(ctx).await;
}
