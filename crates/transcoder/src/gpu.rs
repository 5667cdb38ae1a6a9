//! Hardware encoder detection.
//!
//! Probes for available encoders by running `ffmpeg -encoders` and parsing output.

use std::path::Path;

use tracing::info;
use vidcompress_core::types::HwAccel;

/// What the local ffmpeg build can do.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EncoderCapabilities {
    pub ffmpeg: bool,
    pub libx264: bool,
    pub libx265: bool,
    pub videotoolbox: bool,
}

impl EncoderCapabilities {
    /// Parse the listing printed by `ffmpeg -encoders`.
    pub fn from_listing(encoders: &str) -> Self {
        Self {
            ffmpeg: true,
            libx264: encoders.contains("libx264"),
            libx265: encoders.contains("libx265"),
            videotoolbox: encoders.contains("h264_videotoolbox"),
        }
    }

    /// Hardware backends that can be offered to callers.
    pub fn hardware(&self) -> Vec<HwAccel> {
        let mut out = vec![HwAccel::None];
        if self.videotoolbox {
            out.push(HwAccel::VideoToolbox);
        }
        out
    }
}

/// Detect available encoders by querying ffmpeg.
pub async fn detect(ffmpeg_path: &Path) -> EncoderCapabilities {
    let encoders = match get_encoders(ffmpeg_path).await {
        Ok(s) => s,
        Err(e) => {
            info!(error = %e, "could not query ffmpeg encoders");
            return EncoderCapabilities::default();
        }
    };

    let caps = EncoderCapabilities::from_listing(&encoders);
    info!(?caps, "encoder detection complete");
    caps
}

async fn get_encoders(ffmpeg_path: &Path) -> Result<String, String> {
    let output = tokio::process::Command::new(ffmpeg_path)
        .args(["-hide_banner", "-encoders"])
        .output()
        .await
        .map_err(|e| format!("spawn ffmpeg: {e}"))?;

    if !output.status.success() {
        return Err("ffmpeg -encoders failed".into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
