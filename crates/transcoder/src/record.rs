use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vidcompress_core::types::{AudioCodec, HwAccel, ModeDecider, SpeedMode, VideoCodec};

use crate::service::CompressOutcome;

/// What a finished compression produced, kept for the result page,
/// downloads and `/meta`.
#[derive(Debug, Clone, Serialize)]
pub struct ResultRecord {
    pub id: String,
    #[serde(skip)]
    pub file_path: PathBuf,
    #[serde(skip)]
    pub file_name: String,
    pub mode: SpeedMode,
    pub mode_decider: ModeDecider,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// Output size actually produced, see `EncodeProfile::resolution_label`.
    pub resolution: String,
    pub codec: VideoCodec,
    pub audio: AudioCodec,
    pub hw: HwAccel,
    #[serde(rename = "encode_duration_ms")]
    pub elapsed_ms: u64,
    pub throughput_mb_s: f64,
    pub created_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(
        id: String,
        file_path: PathBuf,
        input_bytes: u64,
        outcome: &CompressOutcome,
    ) -> Self {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            id,
            file_path,
            file_name,
            mode: outcome.profile.mode,
            mode_decider: outcome.decider,
            input_bytes,
            output_bytes: outcome.output_bytes,
            resolution: outcome.profile.resolution_label(),
            codec: outcome.profile.video_codec,
            audio: outcome.profile.audio_codec,
            hw: outcome.profile.hw,
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            throughput_mb_s: outcome.throughput_mb_s,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::EncodeProfile;
    use std::time::Duration;
    use vidcompress_core::types::EncodeRequest;

    #[test]
    fn serializes_meta_keys() {
        let outcome = CompressOutcome {
            profile: EncodeProfile::new(&EncodeRequest::default(), SpeedMode::Fast),
            decider: ModeDecider::Auto,
            attempts: 1,
            output_bytes: 2048,
            elapsed: Duration::from_millis(1500),
            throughput_mb_s: 3.25,
        };
        let record = ResultRecord::new(
            "abc".into(),
            PathBuf::from("/tmp/x_compressed.mp4"),
            5 * 1024 * 1024,
            &outcome,
        );
        assert_eq!(record.file_name, "x_compressed.mp4");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "abc");
        assert_eq!(json["mode"], "fast");
        assert_eq!(json["mode_decider"], "ai");
        assert_eq!(json["codec"], "h264");
        assert_eq!(json["audio"], "aac");
        assert_eq!(json["hw"], "none");
        assert_eq!(json["resolution"], "original");
        assert_eq!(json["encode_duration_ms"], 1500);
        assert_eq!(json["throughput_mb_s"], 3.25);
        assert!(json.get("file_path").is_none());
    }
}
