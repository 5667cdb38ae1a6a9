use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Named compression aggressiveness preset.
///
/// Wire names follow the upload form: `turbo` is the very-fast preview mode
/// and `max` the maximum-compression mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedMode {
    #[serde(rename = "turbo")]
    VeryFastPreview,
    #[serde(rename = "max")]
    MaxCompression,
    #[serde(rename = "ultra_fast")]
    UltraFast,
    #[serde(rename = "super_fast")]
    SuperFast,
    #[serde(rename = "fast")]
    Fast,
    #[serde(rename = "balanced")]
    Balanced,
    #[serde(rename = "quality")]
    Quality,
}

impl SpeedMode {
    pub const ALL: [SpeedMode; 7] = [
        Self::VeryFastPreview,
        Self::MaxCompression,
        Self::UltraFast,
        Self::SuperFast,
        Self::Fast,
        Self::Balanced,
        Self::Quality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryFastPreview => "turbo",
            Self::MaxCompression => "max",
            Self::UltraFast => "ultra_fast",
            Self::SuperFast => "super_fast",
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Quality => "quality",
        }
    }

    /// Parse a mode name. Unknown or empty names yield `Balanced`.
    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "turbo" | "very_fast_preview" => Self::VeryFastPreview,
            "max" | "max_compression" => Self::MaxCompression,
            "ultra_fast" => Self::UltraFast,
            "super_fast" => Self::SuperFast,
            "fast" => Self::Fast,
            "quality" => Self::Quality,
            _ => Self::Balanced,
        }
    }

    /// The two preview modes that get long-edge scaling and speed tuning.
    pub fn is_preview(self) -> bool {
        matches!(self, Self::VeryFastPreview | Self::MaxCompression)
    }
}

impl std::fmt::Display for SpeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode as requested by the caller: automatic (size-based) or a fixed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModeRequest {
    #[default]
    Auto,
    Manual(SpeedMode),
}

impl ModeRequest {
    /// Empty input means automatic, like the form default.
    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "" | "ai" | "auto" | "automatic" => Self::Auto,
            other => Self::Manual(SpeedMode::parse(other)),
        }
    }
}

/// Who picked the final mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeDecider {
    #[serde(rename = "ai")]
    Auto,
    #[serde(rename = "manual")]
    Manual,
}

impl ModeDecider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "ai",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for ModeDecider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named output resolution tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "2160p")]
    P2160,
    #[default]
    #[serde(rename = "original")]
    Original,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P1440 => "1440p",
            Self::P2160 => "2160p",
            Self::Original => "original",
        }
    }

    /// Unknown tiers keep the original resolution.
    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "360p" => Self::P360,
            "480p" => Self::P480,
            "720p" => Self::P720,
            "1080p" => Self::P1080,
            "1440p" => Self::P1440,
            "2160p" => Self::P2160,
            _ => Self::Original,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    #[default]
    H264,
    H265,
    /// Stream copy, no re-encode.
    Copy,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "h265",
            Self::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "h265" | "hevc" => Self::H265,
            "copy" | "passthrough" => Self::Copy,
            _ => Self::H264,
        }
    }

    pub fn is_copy(self) -> bool {
        matches!(self, Self::Copy)
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioCodec {
    #[default]
    Aac,
    Opus,
    Copy,
}

impl AudioCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Copy => "copy",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "opus" => Self::Opus,
            "copy" | "passthrough" => Self::Copy,
            _ => Self::Aac,
        }
    }
}

impl std::fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware acceleration backend. `None` means CPU encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HwAccel {
    #[default]
    None,
    VideoToolbox,
}

impl HwAccel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::VideoToolbox => "videotoolbox",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalize(s).as_str() {
            "videotoolbox" => Self::VideoToolbox,
            _ => Self::None,
        }
    }

    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for HwAccel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output container, identified by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    #[default]
    Mp4,
    Mov,
}

impl Container {
    /// Extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => ".mp4",
            Self::Mov => ".mov",
        }
    }

    pub fn parse(s: &str) -> Self {
        match normalize(s).trim_start_matches('.') {
            "mov" => Self::Mov,
            _ => Self::Mp4,
        }
    }
}

/// Highest frame rate a caller may force.
pub const MAX_FPS: u32 = 60;

/// Caller-supplied encode options. Unknown values never fail; they fall
/// back to the defaults of each field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodeRequest {
    pub mode: ModeRequest,
    pub resolution: Resolution,
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    pub hw: HwAccel,
    pub fps: Option<u32>,
    pub container: Container,
}

impl EncodeRequest {
    /// Build from upload form fields (`speed`, `resolution`, `codec`,
    /// `audio`, `hw`, `fps`, `outExt`).
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |key: &str| fields.get(key).map(String::as_str).unwrap_or("");
        Self {
            mode: ModeRequest::parse(get("speed")),
            resolution: Resolution::parse(get("resolution")),
            video_codec: VideoCodec::parse(get("codec")),
            audio_codec: AudioCodec::parse(get("audio")),
            hw: HwAccel::parse(get("hw")),
            fps: parse_fps(get("fps")),
            container: Container::parse(get("outExt")),
        }
    }
}

/// Forced frame rate, kept only when it is a whole number in `1..=60`.
pub fn parse_fps(s: &str) -> Option<u32> {
    s.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=MAX_FPS).contains(n))
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('-', "_")
}
