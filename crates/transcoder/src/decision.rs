//! Encoding-policy decisions: automatic mode selection by input size, the
//! small-input safety override, and orientation-safe scaling for the two
//! preview modes.

use vidcompress_core::types::{
    AudioCodec, EncodeRequest, HwAccel, ModeDecider, ModeRequest, SpeedMode, VideoCodec,
};

use crate::profile::{EncodeProfile, ScaleFilter, preset};

const MB: u64 = 1024 * 1024;

/// Inputs below this many whole megabytes get the safety override.
pub const SMALL_INPUT_MB: u64 = 10;

/// Frame rate the preview modes use when the caller did not force one.
pub const PREVIEW_DEFAULT_FPS: u32 = 24;

/// Whole megabytes, truncating.
pub fn size_mb(bytes: u64) -> u64 {
    bytes / MB
}

/// Strategy that picks a speed mode for an automatic request.
pub trait ModePolicy: Send + Sync {
    fn name(&self) -> &'static str;

    fn select(&self, size_mb: u64) -> SpeedMode;
}

/// Size bands only, evaluated top-down.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePassSizePolicy;

impl ModePolicy for SinglePassSizePolicy {
    fn name(&self) -> &'static str {
        "single_pass"
    }

    fn select(&self, size_mb: u64) -> SpeedMode {
        match size_mb {
            700.. => SpeedMode::UltraFast,
            200.. => SpeedMode::SuperFast,
            50.. => SpeedMode::Fast,
            _ => SpeedMode::Balanced,
        }
    }
}

/// Size bands plus a refinement for `200..2048` MB: up to 250 MB is
/// `Balanced`, above is `UltraFast`.
///
/// This makes 200-250 MB gentler than 50-199 MB. The non-monotonic step is
/// kept as observed behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPassSizePolicy;

impl ModePolicy for TwoPassSizePolicy {
    fn name(&self) -> &'static str {
        "two_pass"
    }

    fn select(&self, size_mb: u64) -> SpeedMode {
        let base = SinglePassSizePolicy.select(size_mb);
        if (200..2048).contains(&size_mb) {
            if size_mb <= 250 {
                SpeedMode::Balanced
            } else {
                SpeedMode::UltraFast
            }
        } else {
            base
        }
    }
}

/// Look up a policy by its configuration name.
pub fn policy_by_name(name: &str) -> Option<Box<dyn ModePolicy>> {
    match name {
        "two_pass" => Some(Box::new(TwoPassSizePolicy)),
        "single_pass" => Some(Box::new(SinglePassSizePolicy)),
        _ => None,
    }
}

/// Resolve the requested mode to a concrete one.
pub fn resolve_mode(
    request: ModeRequest,
    input_bytes: u64,
    policy: &dyn ModePolicy,
) -> (SpeedMode, ModeDecider) {
    match request {
        ModeRequest::Auto => (policy.select(size_mb(input_bytes)), ModeDecider::Auto),
        ModeRequest::Manual(mode) => (mode, ModeDecider::Manual),
    }
}

/// Overwrite the profile with conservative settings for tiny inputs.
///
/// Returns whether the override fired.
pub fn apply_small_input_safety(profile: &mut EncodeProfile, input_bytes: u64) -> bool {
    if size_mb(input_bytes) >= SMALL_INPUT_MB {
        return false;
    }
    profile.video_codec = VideoCodec::H264;
    profile.audio_codec = AudioCodec::Aac;
    profile.scale = None;
    profile.crf = 22;
    profile.preset = preset::FAST;
    profile.hw = HwAccel::None;
    true
}

/// Long-edge bound of a preview mode.
pub fn preview_long_edge(mode: SpeedMode) -> Option<u32> {
    match mode {
        SpeedMode::VeryFastPreview => Some(720),
        SpeedMode::MaxCompression => Some(480),
        _ => None,
    }
}

/// Replace any fixed scale with a long-edge bound for the preview modes,
/// and default their frame rate. Returns whether the policy applied.
pub fn apply_orientation_scale(profile: &mut EncodeProfile) -> bool {
    if profile.video_codec.is_copy() {
        return false;
    }
    let Some(edge) = preview_long_edge(profile.mode) else {
        return false;
    };
    profile.scale = Some(ScaleFilter::LongEdge(edge));
    profile.fps.get_or_insert(PREVIEW_DEFAULT_FPS);
    true
}

/// Final settings for a request plus how the mode was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub profile: EncodeProfile,
    pub decider: ModeDecider,
    pub safety_override: bool,
}

/// Run the whole decision pipeline for one request.
pub fn plan(request: &EncodeRequest, input_bytes: u64, policy: &dyn ModePolicy) -> EncodePlan {
    let (mode, decider) = resolve_mode(request.mode, input_bytes, policy);
    let mut profile = EncodeProfile::new(request, mode);
    let safety_override = apply_small_input_safety(&mut profile, input_bytes);
    apply_orientation_scale(&mut profile);
    EncodePlan {
        profile,
        decider,
        safety_override,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vidcompress_core::types::{Container, Resolution};

    fn select(mb: u64) -> SpeedMode {
        TwoPassSizePolicy.select(mb)
    }

    #[test]
    fn first_pass_bands() {
        assert_eq!(select(0), SpeedMode::Balanced);
        assert_eq!(select(9), SpeedMode::Balanced);
        assert_eq!(select(10), SpeedMode::Balanced);
        assert_eq!(select(49), SpeedMode::Balanced);
        assert_eq!(select(50), SpeedMode::Fast);
        assert_eq!(select(199), SpeedMode::Fast);
    }

    #[test]
    fn ultra_fast_band_starts_at_700() {
        assert_ne!(SinglePassSizePolicy.select(699), SpeedMode::UltraFast);
        assert_eq!(SinglePassSizePolicy.select(700), SpeedMode::UltraFast);
        assert_eq!(select(700), SpeedMode::UltraFast);
        // the 200..2048 refinement already lifts 699 to ultra_fast
        assert_eq!(select(699), SpeedMode::UltraFast);
    }

    #[test]
    fn refinement_band_around_250() {
        assert_eq!(select(200), SpeedMode::Balanced);
        assert_eq!(select(250), SpeedMode::Balanced);
        assert_eq!(select(251), SpeedMode::UltraFast);
        assert_eq!(select(2047), SpeedMode::UltraFast);
        assert_eq!(select(2048), SpeedMode::UltraFast);
    }

    #[test]
    fn single_pass_has_no_refinement() {
        assert_eq!(SinglePassSizePolicy.select(220), SpeedMode::SuperFast);
    }

    #[test]
    fn policy_lookup_by_name() {
        assert_eq!(policy_by_name("two_pass").unwrap().name(), "two_pass");
        assert_eq!(policy_by_name("single_pass").unwrap().name(), "single_pass");
        assert!(policy_by_name("ml").is_none());
    }

    #[test]
    fn manual_mode_is_kept() {
        let (mode, decider) = resolve_mode(
            ModeRequest::Manual(SpeedMode::Quality),
            900 * MB,
            &TwoPassSizePolicy,
        );
        assert_eq!(mode, SpeedMode::Quality);
        assert_eq!(decider, ModeDecider::Manual);
    }

    #[test]
    fn automatic_55mb_resolves_to_fast() {
        let request = EncodeRequest::default();
        let plan = plan(&request, 55 * MB, &TwoPassSizePolicy);
        assert_eq!(plan.decider, ModeDecider::Auto);
        assert_eq!(plan.profile.mode, SpeedMode::Fast);
        assert_eq!(plan.profile.crf, 28);
        assert_eq!(plan.profile.preset, "veryfast");
        assert_eq!(plan.profile.audio_bitrate, "128k");
        assert!(!plan.safety_override);
        assert_eq!(plan.profile.scale, None);
        assert_eq!(plan.profile.fps, None);
    }

    #[test]
    fn turbo_bounds_long_edge_and_defaults_fps() {
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::VeryFastPreview),
            resolution: Resolution::P1080,
            ..Default::default()
        };
        let plan = plan(&request, 100 * MB, &TwoPassSizePolicy);
        assert_eq!(plan.profile.scale, Some(ScaleFilter::LongEdge(720)));
        assert_eq!(plan.profile.fps, Some(24));
    }

    #[test]
    fn max_keeps_forced_fps() {
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::MaxCompression),
            fps: Some(15),
            ..Default::default()
        };
        let plan = plan(&request, 100 * MB, &TwoPassSizePolicy);
        assert_eq!(plan.profile.scale, Some(ScaleFilter::LongEdge(480)));
        assert_eq!(plan.profile.fps, Some(15));
    }

    #[test]
    fn orientation_skipped_for_copy() {
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::VeryFastPreview),
            video_codec: VideoCodec::Copy,
            resolution: Resolution::P720,
            ..Default::default()
        };
        let plan = plan(&request, 100 * MB, &TwoPassSizePolicy);
        assert_eq!(
            plan.profile.scale,
            Some(ScaleFilter::Fixed {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(plan.profile.fps, None);
    }

    #[test]
    fn non_preview_modes_keep_resolution_table_scale() {
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::UltraFast),
            resolution: Resolution::P360,
            ..Default::default()
        };
        let plan = plan(&request, 100 * MB, &TwoPassSizePolicy);
        assert_eq!(
            plan.profile.scale,
            Some(ScaleFilter::Fixed {
                width: 640,
                height: 360
            })
        );
    }

    #[test]
    fn small_input_drops_requested_resolution() {
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::Fast),
            resolution: Resolution::P720,
            video_codec: VideoCodec::H265,
            ..Default::default()
        };
        let small = plan(&request, 2048, &TwoPassSizePolicy);
        assert!(small.safety_override);
        assert_eq!(small.profile.scale, None);
        assert_eq!(small.profile.resolution_label(), "original");

        let large = plan(&request, 20 * MB, &TwoPassSizePolicy);
        assert_eq!(large.profile.resolution_label(), "720p");
    }

    #[test]
    fn small_input_at_ten_mb_is_untouched() {
        let request = EncodeRequest {
            video_codec: VideoCodec::H265,
            ..Default::default()
        };
        let mut profile = EncodeProfile::new(&request, SpeedMode::Quality);
        assert!(!apply_small_input_safety(&mut profile, 10 * MB));
        assert_eq!(profile.video_codec, VideoCodec::H265);
    }

    fn any_request() -> impl Strategy<Value = EncodeRequest> {
        (
            prop::sample::select(SpeedMode::ALL.to_vec()),
            prop::sample::select(vec![
                Resolution::P360,
                Resolution::P1080,
                Resolution::P2160,
                Resolution::Original,
            ]),
            prop::sample::select(vec![VideoCodec::H264, VideoCodec::H265, VideoCodec::Copy]),
            prop::sample::select(vec![AudioCodec::Aac, AudioCodec::Opus, AudioCodec::Copy]),
            prop::sample::select(vec![HwAccel::None, HwAccel::VideoToolbox]),
            prop::option::of(1u32..=60),
            prop::sample::select(vec![Container::Mp4, Container::Mov]),
        )
            .prop_map(|(mode, resolution, video_codec, audio_codec, hw, fps, container)| {
                EncodeRequest {
                    mode: ModeRequest::Manual(mode),
                    resolution,
                    video_codec,
                    audio_codec,
                    hw,
                    fps,
                    container,
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn small_inputs_always_get_safe_profile(
            request in any_request(),
            bytes in 0u64..(10 * MB),
        ) {
            let ModeRequest::Manual(mode) = request.mode else {
                unreachable!("strategy only builds manual requests");
            };
            let mut profile = EncodeProfile::new(&request, mode);
            prop_assert!(apply_small_input_safety(&mut profile, bytes));
            prop_assert_eq!(profile.video_codec, VideoCodec::H264);
            prop_assert_eq!(profile.audio_codec, AudioCodec::Aac);
            prop_assert_eq!(profile.scale, None);
            prop_assert_eq!(profile.crf, 22);
            prop_assert_eq!(profile.preset, "veryfast");
            prop_assert_eq!(profile.hw, HwAccel::None);
        }

        #[test]
        fn two_pass_never_yields_super_fast(mb in 0u64..4096) {
            prop_assert_ne!(TwoPassSizePolicy.select(mb), SpeedMode::SuperFast);
        }
    }
}
