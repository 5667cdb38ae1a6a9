use std::path::Path;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::Response;
use vidcompress_core::error::ApiError;

use crate::error::AppError;

pub fn content_type_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp4" | "m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => "application/octet-stream",
    }
}

/// `attachment; filename="..."` with quotes and control characters dropped.
pub fn attachment_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// Stream a file back as an attachment with any extra headers attached.
/// The file is opened before returning, so callers may unlink it afterwards.
pub async fn attachment(
    path: &Path,
    download_name: &str,
    extra: &[(&'static str, String)],
) -> Result<Response, AppError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("result file not found".into())
        } else {
            ApiError::Internal(format!("open result: {e}"))
        }
    })?;
    let len = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("stat result: {e}")))?
        .len();

    let stream = tokio_util::io::ReaderStream::new(file);
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for_path(path))
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            attachment_disposition(download_name),
        );

    for (name, value) in extra {
        if let Ok(value) = HeaderValue::from_str(value) {
            builder = builder.header(HeaderName::from_static(*name), value);
        }
    }

    builder
        .body(Body::from_stream(stream))
        .map_err(|e| AppError(ApiError::Internal(format!("build response: {e}"))))
}
