//! Speed-profile and resolution lookup tables, and the per-request
//! [`EncodeProfile`] they produce.

use serde::Serialize;
use vidcompress_core::types::{
    AudioCodec, Container, EncodeRequest, HwAccel, Resolution, SpeedMode, VideoCodec,
};

/// x264/x265 preset names used by the profile table.
pub mod preset {
    pub const FASTEST: &str = "ultrafast";
    pub const FAST: &str = "veryfast";
    pub const MEDIUM_FAST: &str = "fast";
}

/// Quality knobs for one speed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeedProfile {
    pub crf: u8,
    pub preset: &'static str,
    pub audio_bitrate: &'static str,
}

/// Look up the quality parameters of a speed mode.
pub fn speed_profile(mode: SpeedMode) -> SpeedProfile {
    let (crf, preset, audio_bitrate) = match mode {
        SpeedMode::VeryFastPreview => (34, preset::FASTEST, "96k"),
        SpeedMode::MaxCompression => (36, preset::FASTEST, "64k"),
        SpeedMode::UltraFast => (32, preset::FASTEST, "96k"),
        SpeedMode::SuperFast => (30, preset::FASTEST, "96k"),
        SpeedMode::Fast => (28, preset::FAST, "128k"),
        SpeedMode::Balanced => (26, preset::FAST, "128k"),
        SpeedMode::Quality => (23, preset::MEDIUM_FAST, "128k"),
    };
    SpeedProfile {
        crf,
        preset,
        audio_bitrate,
    }
}

/// Scale target for the video filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScaleFilter {
    /// Fixed `width:height`.
    Fixed { width: u32, height: u32 },
    /// Bound the long edge to this many pixels, short edge automatic.
    LongEdge(u32),
}

impl ScaleFilter {
    /// Render as an ffmpeg `-vf` expression.
    ///
    /// For `LongEdge`, `a` is the runtime aspect ratio: landscape
    /// (`a > 1`) bounds the height, portrait bounds the width. `-2` keeps
    /// the automatic edge even.
    pub fn to_filter(self) -> String {
        match self {
            Self::Fixed { width, height } => {
                format!("scale={width}:{height}:flags=fast_bilinear,setsar=1")
            }
            Self::LongEdge(n) => format!(
                "scale='if(gt(a,1),-2,{n})':'if(gt(a,1),{n},-2)':flags=fast_bilinear,setsar=1"
            ),
        }
    }
}

/// Look up the fixed scale of a resolution tier. `Original` keeps the
/// source size.
pub fn resolution_scale(resolution: Resolution) -> Option<ScaleFilter> {
    let (width, height) = match resolution {
        Resolution::P360 => (640, 360),
        Resolution::P480 => (854, 480),
        Resolution::P720 => (1280, 720),
        Resolution::P1080 => (1920, 1080),
        Resolution::P1440 => (2560, 1440),
        Resolution::P2160 => (3840, 2160),
        Resolution::Original => return None,
    };
    Some(ScaleFilter::Fixed { width, height })
}

/// Concrete encode settings for one request.
///
/// Built fresh from the request and the lookup tables, then adjusted by the
/// small-input safety and orientation policies in [`crate::decision`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeProfile {
    pub mode: SpeedMode,
    pub crf: u8,
    pub preset: &'static str,
    pub audio_bitrate: &'static str,
    pub scale: Option<ScaleFilter>,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub hw: HwAccel,
    pub fps: Option<u32>,
    pub container: Container,
}

impl EncodeProfile {
    pub fn new(request: &EncodeRequest, mode: SpeedMode) -> Self {
        let sp = speed_profile(mode);
        Self {
            mode,
            crf: sp.crf,
            preset: sp.preset,
            audio_bitrate: sp.audio_bitrate,
            scale: resolution_scale(request.resolution),
            video_codec: request.video_codec,
            audio_codec: request.audio_codec,
            hw: request.hw,
            fps: request.fps,
            container: request.container,
        }
    }

    /// Output size actually produced: `original` when nothing is scaled
    /// (including stream copy), the tier name for a fixed scale, or
    /// `long_edge_<n>` for a long-edge bound.
    pub fn resolution_label(&self) -> String {
        if self.video_codec.is_copy() {
            return Resolution::Original.as_str().to_string();
        }
        match self.scale {
            None => Resolution::Original.as_str().to_string(),
            Some(ScaleFilter::Fixed { height, .. }) => format!("{height}p"),
            Some(ScaleFilter::LongEdge(n)) => format!("long_edge_{n}"),
        }
    }

    /// Same settings with hardware acceleration turned off.
    pub fn without_hardware(&self) -> Self {
        Self {
            hw: HwAccel::None,
            ..self.clone()
        }
    }
}
