//! Compile an [`EncodeProfile`] into the ordered ffmpeg argument list.

use std::path::Path;

use vidcompress_core::types::{AudioCodec, Container, HwAccel, SpeedMode, VideoCodec};

use crate::profile::EncodeProfile;

/// Keyframe interval used by the preview modes.
const PREVIEW_GOP: &str = "300";

const X264_PREVIEW_PARAMS: &str = "no-scenecut=1:ref=1:bframes=0:me=dia:subme=0:trellis=0:aq-mode=0:fast_pskip=1:sync-lookahead=0:rc-lookahead=0";

const X265_PREVIEW_PARAMS: &str =
    "scenecut=0:ref=1:bframes=0:me=dia:subme=0:rdoq-level=0:early-skip=1:rc-lookahead=0";

/// Concrete ffmpeg video encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    Libx264,
    Libx265,
    H264VideoToolbox,
    HevcVideoToolbox,
    Copy,
}

impl VideoEncoder {
    /// Resolve codec and hardware flag to an encoder.
    pub fn select(codec: VideoCodec, hw: HwAccel) -> Self {
        match (codec, hw) {
            (VideoCodec::Copy, _) => Self::Copy,
            (VideoCodec::H264, HwAccel::VideoToolbox) => Self::H264VideoToolbox,
            (VideoCodec::H264, HwAccel::None) => Self::Libx264,
            (VideoCodec::H265, HwAccel::VideoToolbox) => Self::HevcVideoToolbox,
            (VideoCodec::H265, HwAccel::None) => Self::Libx265,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Libx265 => "libx265",
            Self::H264VideoToolbox => "h264_videotoolbox",
            Self::HevcVideoToolbox => "hevc_videotoolbox",
            Self::Copy => "copy",
        }
    }

    pub fn is_hardware(self) -> bool {
        matches!(self, Self::H264VideoToolbox | Self::HevcVideoToolbox)
    }
}

/// Hardware encoders have no CRF; map it onto a bitrate ladder.
pub fn hardware_bitrate(crf: u8, mode: SpeedMode) -> &'static str {
    if mode == SpeedMode::VeryFastPreview {
        return "2.5M";
    }
    match crf {
        0..=20 => "5M",
        21..=23 => "4M",
        24..=26 => "3M",
        27..=30 => "2.5M",
        31..=36 => "2M",
        _ => "1.5M",
    }
}

/// Build the full argument list, output path last.
pub fn build_ffmpeg_args(input: &Path, output: &Path, profile: &EncodeProfile) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
    ];

    let encoder = VideoEncoder::select(profile.video_codec, profile.hw);

    // HW decode hint. Frames are downloaded to system memory so the software
    // scale and pixel-format stages can still run.
    if encoder.is_hardware() {
        args.extend(["-hwaccel".into(), "videotoolbox".into()]);
    }

    args.extend(["-i".into(), input.to_string_lossy().into_owned()]);

    let reencode = !profile.video_codec.is_copy();

    if reencode {
        if let Some(scale) = profile.scale {
            args.extend(["-vf".into(), scale.to_filter()]);
        }
        if let Some(fps) = profile.fps {
            args.extend(["-r".into(), fps.to_string()]);
        }
    }

    args.extend(["-c:v".into(), encoder.as_str().into()]);

    if encoder.is_hardware() {
        args.extend([
            "-b:v".into(),
            hardware_bitrate(profile.crf, profile.mode).into(),
        ]);
    } else if reencode {
        args.extend([
            "-crf".into(),
            profile.crf.to_string(),
            "-preset".into(),
            profile.preset.into(),
        ]);
    }

    if reencode && profile.container == Container::Mp4 {
        args.extend(["-pix_fmt".into(), "yuv420p".into()]);
    }

    if profile.mode.is_preview() {
        args.extend(preview_tuning(encoder));
    }

    args.extend(audio_args(profile));

    args.extend([
        "-movflags".into(),
        "+faststart".into(),
        "-threads".into(),
        "0".into(),
        output.to_string_lossy().into_owned(),
    ]);
    args
}

/// Speed tuning for the preview modes, per encoder.
fn preview_tuning(encoder: VideoEncoder) -> Vec<String> {
    match encoder {
        VideoEncoder::Libx264 => vec![
            "-tune".into(),
            "fastdecode,zerolatency".into(),
            "-g".into(),
            PREVIEW_GOP.into(),
            "-keyint_min".into(),
            PREVIEW_GOP.into(),
            "-x264-params".into(),
            X264_PREVIEW_PARAMS.into(),
        ],
        VideoEncoder::Libx265 => vec![
            "-tune".into(),
            "zerolatency".into(),
            "-g".into(),
            PREVIEW_GOP.into(),
            "-keyint_min".into(),
            PREVIEW_GOP.into(),
            "-x265-params".into(),
            X265_PREVIEW_PARAMS.into(),
        ],
        VideoEncoder::H264VideoToolbox | VideoEncoder::HevcVideoToolbox => vec![
            "-realtime".into(),
            "true".into(),
            "-g".into(),
            PREVIEW_GOP.into(),
        ],
        VideoEncoder::Copy => Vec::new(),
    }
}

fn audio_args(profile: &EncodeProfile) -> Vec<String> {
    let encoder = match profile.audio_codec {
        AudioCodec::Copy => return vec!["-c:a".into(), "copy".into()],
        AudioCodec::Opus => "libopus",
        AudioCodec::Aac => "aac",
    };

    // turbo: stereo 96k, max: mono 64k, whatever the profile says
    let (bitrate, channels) = match profile.mode {
        SpeedMode::VeryFastPreview => ("96k", Some("2")),
        SpeedMode::MaxCompression => ("64k", Some("1")),
        _ => (profile.audio_bitrate, None),
    };

    let mut args: Vec<String> = vec![
        "-c:a".into(),
        encoder.into(),
        "-b:a".into(),
        bitrate.into(),
    ];
    if let Some(ch) = channels {
        args.extend(["-ac".into(), ch.into()]);
    }
    args
}
