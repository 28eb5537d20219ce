//! Extractors that turn malformed bodies into 422 validation failures

use crate::{ApiRejection, ApiResponse};
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::Json,
};
use serde::de::DeserializeOwned;

/// JSON body extractor; every rejection (bad syntax, wrong shape, missing
/// content type) becomes `422 Unprocessable Entity`, except a body over the
/// size limit which stays `413 Payload Too Large`
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(body_rejection(rejection.status(), rejection.body_text())),
        }
    }
}

/// Build a 422 response
pub fn validation_error(message: impl Into<String>) -> ApiRejection {
    let message = message.into();
    tracing::debug!("Request validation failed: {}", message);
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiResponse::error(message)))
}

/// Map an axum body rejection: size-limit failures keep 413, the rest are 422
pub fn body_rejection(status: StatusCode, message: String) -> ApiRejection {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::debug!("Request body too large: {}", message);
        (status, Json(ApiResponse::error(message)))
    } else {
        validation_error(message)
    }
}
