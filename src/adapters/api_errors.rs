use crate::domain::error::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype so the domain error can be returned straight from handlers.
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            PipelineError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            PipelineError::AuthenticationFailure(msg) => {
                tracing::warn!("webhook rejected: {msg}");
                (StatusCode::BAD_REQUEST, "invalid webhook signature".to_string())
            }
            PipelineError::ProviderUnavailable(msg) => {
                tracing::error!("provider error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "payment provider unavailable".to_string(),
                )
            }
            err => {
                tracing::error!("internal error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
