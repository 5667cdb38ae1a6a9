//! Multipart upload handling: the `file` part is streamed to the work dir,
//! every other part is collected as a text field.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use vidcompress_core::error::ApiError;

/// A file in the work dir that is removed on drop unless kept.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop tracking the file so it outlives this guard.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }

    /// Delete the file on the blocking pool.
    pub async fn remove(self) {
        let path = self.keep();
        log_removal(&path, tokio::fs::remove_file(&path).await);
    }
}

impl Drop for TempFile {
    // Early returns and cancelled requests land here; a single unlink.
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        log_removal(&self.path, std::fs::remove_file(&self.path));
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => debug!(path = %path.display(), "removed temp file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

#[derive(Debug)]
pub struct Upload {
    pub file: TempFile,
    pub original_name: String,
    pub bytes: u64,
    pub fields: HashMap<String, String>,
}

/// Keep only `[A-Za-z0-9._-]` from the last path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("expecting multipart/form-data: {}", e.body_text()))
}

/// Read the whole form. Fails with `BadRequest` when there is no non-empty
/// `file` part.
pub async fn receive(mut multipart: Multipart, work_dir: &Path) -> Result<Upload, ApiError> {
    let mut fields = HashMap::new();
    let mut file: Option<(TempFile, String, u64)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" && file.is_none() {
            let original = field.file_name().unwrap_or("upload").to_string();
            let stored = work_dir.join(format!(
                "{}_{}",
                uuid::Uuid::new_v4().simple(),
                sanitize_file_name(&original)
            ));
            let guard = TempFile::new(stored);

            let mut out = tokio::fs::File::create(guard.path())
                .await
                .map_err(|e| ApiError::Internal(format!("create upload file: {e}")))?;
            let mut written = 0u64;
            while let Some(chunk) = field.chunk().await.map_err(bad_multipart)? {
                out.write_all(&chunk)
                    .await
                    .map_err(|e| ApiError::Internal(format!("write upload file: {e}")))?;
                written += chunk.len() as u64;
            }
            out.flush()
                .await
                .map_err(|e| ApiError::Internal(format!("flush upload file: {e}")))?;

            file = Some((guard, original, written));
            continue;
        }

        let value = field.text().await.map_err(bad_multipart)?;
        fields.insert(name, value);
    }

    match file {
        Some((file, original_name, bytes)) if bytes > 0 => Ok(Upload {
            file,
            original_name,
            bytes,
            fields,
        }),
        _ => Err(ApiError::BadRequest("file field required".into())),
    }
}
