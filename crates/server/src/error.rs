use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vidcompress_core::error::{ApiError, ErrorEnvelope};
use vidcompress_transcoder::TranscodeError;

/// Newtype wrapper so we can implement `IntoResponse` in this crate.
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope = ErrorEnvelope::from(&self.0);
        (status, Json(envelope)).into_response()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        Self(e)
    }
}

impl From<TranscodeError> for AppError {
    fn from(e: TranscodeError) -> Self {
        Self(match e {
            TranscodeError::FfmpegFailed(msg) => ApiError::TranscodeFailed(msg),
            TranscodeError::OutputInvalid(msg) => ApiError::OutputInvalid(msg),
            TranscodeError::Timeout(after) => ApiError::Timeout(format!("after {after:?}")),
            other => ApiError::Internal(other.to_string()),
        })
    }
}
