pub mod args;
pub mod decision;
pub mod gpu;
pub mod invoke;
pub mod profile;
pub mod record;
pub mod service;

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("ffmpeg not found at {0}")]
    BinaryNotFound(PathBuf),
    #[error("failed to start ffmpeg: {0}")]
    Spawn(String),
    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),
    #[error("output invalid: {0}")]
    OutputInvalid(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Global transcoder configuration.
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    pub ffmpeg_path: PathBuf,
    /// Uploads and outputs live here.
    pub work_dir: PathBuf,
    pub max_concurrent: usize,
    /// Deadline for one job, hardware retry included.
    pub job_timeout: Duration,
    /// Outputs smaller than this are treated as failed encodes.
    pub min_output_bytes: u64,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            work_dir: std::env::temp_dir().join("vidcompress"),
            max_concurrent: 4,
            job_timeout: Duration::from_secs(45 * 60),
            min_output_bytes: 1024,
        }
    }
}
