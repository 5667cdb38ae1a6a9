//! Run ffmpeg for a profile, falling back to software encoding once when a
//! hardware attempt fails.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{info, warn};

use crate::TranscodeError;
use crate::args::build_ffmpeg_args;
use crate::profile::EncodeProfile;

/// Outcome of one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub success: bool,
    /// Diagnostic text from stderr, trimmed.
    pub diagnostics: String,
}

/// Something that can execute the transcoder binary.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> Result<RunOutput, TranscodeError>;
}

/// Runs the real binary via `tokio::process`.
///
/// The child is killed if the returned future is dropped, so a timeout or a
/// client disconnect terminates the encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegRunner;

#[async_trait::async_trait]
impl ProcessRunner for FfmpegRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<RunOutput, TranscodeError> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::BinaryNotFound(program.to_path_buf())
                } else {
                    TranscodeError::Spawn(e.to_string())
                }
            })?;

        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostics = if diagnostics.is_empty() && !output.status.success() {
            format!("ffmpeg exited with {}", output.status)
        } else {
            diagnostics
        };

        Ok(RunOutput {
            success: output.status.success(),
            diagnostics,
        })
    }
}

/// Which try this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Primary,
    SoftwareRetry,
}

enum InvokeState {
    Idle,
    Running {
        profile: EncodeProfile,
        attempt: Attempt,
    },
    Failed {
        profile: EncodeProfile,
        attempt: Attempt,
        diagnostics: String,
    },
    Succeeded {
        profile: EncodeProfile,
        attempt: Attempt,
    },
}

/// A finished encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Profile of the attempt that succeeded; `hw` is what was actually used.
    pub profile: EncodeProfile,
    pub attempts: u8,
}

/// Run the transcoder once, retrying exactly once with hardware off if a
/// hardware attempt exits non-zero.
pub async fn invoke(
    runner: &dyn ProcessRunner,
    program: &Path,
    input: &Path,
    output: &Path,
    profile: &EncodeProfile,
) -> Result<Invocation, TranscodeError> {
    let mut state = InvokeState::Idle;
    loop {
        state = match state {
            InvokeState::Idle => InvokeState::Running {
                profile: profile.clone(),
                attempt: Attempt::Primary,
            },
            InvokeState::Running { profile, attempt } => {
                let args = build_ffmpeg_args(input, output, &profile);
                info!(?attempt, hw = %profile.hw, mode = %profile.mode, args = %args.join(" "), "running ffmpeg");
                let out = runner.run(program, &args).await?;
                if out.success {
                    InvokeState::Succeeded { profile, attempt }
                } else {
                    InvokeState::Failed {
                        profile,
                        attempt,
                        diagnostics: out.diagnostics,
                    }
                }
            }
            InvokeState::Failed {
                profile,
                attempt: Attempt::Primary,
                diagnostics,
            } if profile.hw.is_enabled() => {
                warn!(hw = %profile.hw, error = %diagnostics, "hardware encode failed, retrying on CPU");
                InvokeState::Running {
                    profile: profile.without_hardware(),
                    attempt: Attempt::SoftwareRetry,
                }
            }
            InvokeState::Failed {
                attempt,
                diagnostics,
                ..
            } => {
                warn!(?attempt, error = %diagnostics, "ffmpeg failed");
                return Err(TranscodeError::FfmpegFailed(diagnostics));
            }
            InvokeState::Succeeded { profile, attempt } => {
                let attempts = match attempt {
                    Attempt::Primary => 1,
                    Attempt::SoftwareRetry => 2,
                };
                return Ok(Invocation { profile, attempts });
            }
        };
    }
}

/// Check that the output exists and is at least `min_bytes` long. Returns
/// its size.
pub async fn validate_output(path: &Path, min_bytes: u64) -> Result<u64, TranscodeError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| TranscodeError::OutputInvalid(format!("{}: {e}", path.display())))?;
    if meta.len() < min_bytes {
        return Err(TranscodeError::OutputInvalid(format!(
            "{} is {} bytes, expected at least {min_bytes}",
            path.display(),
            meta.len()
        )));
    }
    Ok(meta.len())
}

/// Output path next to the input: `<stem>_compressed<ext>`.
pub fn output_path_for(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_compressed{extension}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use vidcompress_core::types::{EncodeRequest, HwAccel, SpeedMode};

    /// Replays scripted outcomes and records every argument list.
    pub(crate) struct ScriptedRunner {
        outcomes: Mutex<Vec<bool>>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new(outcomes: &[bool]) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().rev().copied().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, _program: &Path, args: &[String]) -> Result<RunOutput, TranscodeError> {
            self.calls.lock().unwrap().push(args.to_vec());
            let success = self.outcomes.lock().unwrap().pop().unwrap_or(false);
            Ok(RunOutput {
                success,
                diagnostics: if success {
                    String::new()
                } else {
                    "encoder error".into()
                },
            })
        }
    }

    fn profile(hw: HwAccel) -> EncodeProfile {
        let request = EncodeRequest {
            hw,
            ..Default::default()
        };
        EncodeProfile::new(&request, SpeedMode::Balanced)
    }

    async fn run(runner: &ScriptedRunner, hw: HwAccel) -> Result<Invocation, TranscodeError> {
        invoke(
            runner,
            Path::new("ffmpeg"),
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &profile(hw),
        )
        .await
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let runner = ScriptedRunner::new(&[true]);
        let inv = run(&runner, HwAccel::VideoToolbox).await.unwrap();
        assert_eq!(inv.attempts, 1);
        assert_eq!(inv.profile.hw, HwAccel::VideoToolbox);
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn hardware_failure_retries_once_on_cpu() {
        let runner = ScriptedRunner::new(&[false, true]);
        let inv = run(&runner, HwAccel::VideoToolbox).await.unwrap();
        assert_eq!(inv.attempts, 2);
        assert_eq!(inv.profile.hw, HwAccel::None);

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].contains(&"h264_videotoolbox".to_string()));
        assert!(calls[0].contains(&"-hwaccel".to_string()));
        assert!(calls[1].contains(&"libx264".to_string()));
        assert!(!calls[1].contains(&"-hwaccel".to_string()));
    }

    #[tokio::test]
    async fn hardware_and_retry_both_fail() {
        let runner = ScriptedRunner::new(&[false, false, true]);
        let err = run(&runner, HwAccel::VideoToolbox).await.unwrap_err();
        assert!(matches!(err, TranscodeError::FfmpegFailed(ref msg) if msg == "encoder error"));
        assert_eq!(runner.call_count(), 2);
    }

    #[tokio::test]
    async fn software_failure_does_not_retry() {
        let runner = ScriptedRunner::new(&[false, true]);
        let err = run(&runner, HwAccel::None).await.unwrap_err();
        assert!(matches!(err, TranscodeError::FfmpegFailed(_)));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_binary_is_reported() {
        let err = FfmpegRunner
            .run(Path::new("/nonexistent/ffmpeg-binary"), &["-version".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::BinaryNotFound(_)));
    }

    #[tokio::test]
    async fn output_validation_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.mp4");
        tokio::fs::write(&small, vec![0u8; 100]).await.unwrap();
        assert!(matches!(
            validate_output(&small, 1024).await,
            Err(TranscodeError::OutputInvalid(_))
        ));

        let ok = dir.path().join("ok.mp4");
        tokio::fs::write(&ok, vec![0u8; 4096]).await.unwrap();
        assert_eq!(validate_output(&ok, 1024).await.unwrap(), 4096);

        let missing = dir.path().join("missing.mp4");
        assert!(validate_output(&missing, 1024).await.is_err());
    }

    #[test]
    fn output_path_keeps_directory() {
        let out = output_path_for(Path::new("/tmp/work/abc_clip.mov"), ".mp4");
        assert_eq!(out, PathBuf::from("/tmp/work/abc_clip_compressed.mp4"));
    }
}
