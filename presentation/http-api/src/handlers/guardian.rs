//! Live camera frame guidance

use crate::extract::{body_rejection, validation_error};
use crate::{handle_core_error, ApiRejection, AppState};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, OriginalUri, State,
    },
    http::{HeaderMap, Method},
    response::Json,
};
use jaga_core::ingest;
use jaga_core::prelude::*;
use serde_json::json;

/// Name of the multipart part carrying the frame
pub const FILE_FIELD: &str = "file";

/// `POST /guardian/frame`
pub async fn process_frame(
    State(state): State<AppState>,
    method: Method,
    uri: OriginalUri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GuardianReport>, ApiRejection> {
    let mut multipart = multipart.map_err(|rejection| validation_error(rejection.body_text()))?;
    let frame = read_frame(&mut multipart, state.service.max_frame_bytes()).await?;

    let mut ctx = super::request_context(AnalysisMode::Guardian, &method, &uri, &headers);
    ctx.operation_input = Some(json!({
        "file_name": frame.file_name,
        "mime_type": frame.mime_type,
        "bytes": frame.len(),
    }));

    let ctx = super::before_operation(&state, ctx).await?;

    match state.service.process_frame(frame).await {
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

/// Pull the `file` upload out of the form; other parts are skipped. A plain
/// text part named `file` (no `filename`) is not an upload and is rejected.
async fn read_frame(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<MediaFrame, ApiRejection> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_string) else {
            return Err(validation_error(format!(
                "Part '{}' must be a file upload",
                FILE_FIELD
            )));
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        return ingest::normalize_frame(
            Some(file_name),
            content_type.as_deref(),
            data.to_vec(),
            max_bytes,
        )
        .map_err(|e| handle_core_error(e.into()));
    }

    Err(handle_core_error(IngestError::MissingField(FILE_FIELD.to_string()).into()))
}

fn multipart_error(err: MultipartError) -> ApiRejection {
    body_rejection(err.status(), err.body_text())
}
