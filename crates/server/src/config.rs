//! Environment-driven configuration.

use std::path::PathBuf;
use std::time::Duration;

use vidcompress_transcoder::TranscoderConfig;

/// Largest accepted upload by default: 2 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 2 << 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub result_ttl: Duration,
    pub result_capacity: usize,
    /// Name of the automatic mode policy (`two_pass` or `single_pass`).
    pub mode_policy: String,
    pub transcoder: TranscoderConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values use defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());

        let bind_addr = get("VIDCOMPRESS_BIND")
            .or_else(|| get("PORT").map(|p| format!("0.0.0.0:{p}")))
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let defaults = TranscoderConfig::default();
        let transcoder = TranscoderConfig {
            ffmpeg_path: get("VIDCOMPRESS_FFMPEG")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            work_dir: get("VIDCOMPRESS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_concurrent: parsed("VIDCOMPRESS_MAX_TRANSCODES")
                .map(|n| n as usize)
                .unwrap_or(defaults.max_concurrent),
            job_timeout: parsed("VIDCOMPRESS_JOB_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.job_timeout),
            min_output_bytes: defaults.min_output_bytes,
        };

        Self {
            bind_addr,
            max_upload_bytes: parsed("VIDCOMPRESS_MAX_UPLOAD_BYTES")
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            result_ttl: parsed("VIDCOMPRESS_RESULT_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60 * 60)),
            result_capacity: parsed("VIDCOMPRESS_RESULT_CAPACITY")
                .map(|n| n as usize)
                .unwrap_or(256),
            mode_policy: get("VIDCOMPRESS_MODE_POLICY").unwrap_or_else(|| "two_pass".to_string()),
            transcoder,
        }
    }
}
