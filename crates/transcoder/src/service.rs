use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{info, warn};
use vidcompress_core::types::{EncodeRequest, ModeDecider};

use crate::decision::{ModePolicy, plan, size_mb};
use crate::invoke::{FfmpegRunner, ProcessRunner, invoke, validate_output};
use crate::profile::EncodeProfile;
use crate::{TranscodeError, TranscoderConfig};

/// One compression job: an already persisted upload and where to write.
#[derive(Debug, Clone)]
pub struct CompressJob {
    pub request: EncodeRequest,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_bytes: u64,
}

/// A finished, validated compression.
#[derive(Debug, Clone)]
pub struct CompressOutcome {
    pub profile: EncodeProfile,
    pub decider: ModeDecider,
    pub attempts: u8,
    pub output_bytes: u64,
    pub elapsed: Duration,
    pub throughput_mb_s: f64,
}

/// Input megabytes per second of wall time. Zero for a zero duration.
pub fn throughput_mb_s(input_bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (input_bytes as f64 / (1024.0 * 1024.0)) / secs
    } else {
        0.0
    }
}

/// Runs compression jobs with bounded concurrency.
pub struct Transcoder {
    config: TranscoderConfig,
    policy: Box<dyn ModePolicy>,
    runner: Arc<dyn ProcessRunner>,
    permits: Arc<Semaphore>,
}

impl Transcoder {
    pub fn new(config: TranscoderConfig, policy: Box<dyn ModePolicy>) -> Self {
        Self::with_runner(config, policy, Arc::new(FfmpegRunner))
    }

    pub fn with_runner(
        config: TranscoderConfig,
        policy: Box<dyn ModePolicy>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            policy,
            runner,
            permits,
        }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.config.max_concurrent.max(1) - self.permits.available_permits()
    }

    /// Plan, run and validate one job. Waits for a free slot first; the
    /// job timeout starts once the slot is held.
    pub async fn compress(&self, job: &CompressJob) -> Result<CompressOutcome, TranscodeError> {
        let plan = plan(&job.request, job.input_bytes, self.policy.as_ref());
        info!(
            input = %job.input_path.display(),
            size_mb = size_mb(job.input_bytes),
            mode = %plan.profile.mode,
            decider = %plan.decider,
            safety_override = plan.safety_override,
            "encode plan ready"
        );

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TranscodeError::Spawn("transcoder is shut down".into()))?;

        let start = Instant::now();
        let invocation = tokio::time::timeout(
            self.config.job_timeout,
            invoke(
                self.runner.as_ref(),
                &self.config.ffmpeg_path,
                &job.input_path,
                &job.output_path,
                &plan.profile,
            ),
        )
        .await
        .map_err(|_| {
            warn!(timeout = ?self.config.job_timeout, "ffmpeg timed out, killed");
            TranscodeError::Timeout(self.config.job_timeout)
        })??;
        let elapsed = start.elapsed();

        let output_bytes = validate_output(&job.output_path, self.config.min_output_bytes).await?;
        let throughput = throughput_mb_s(job.input_bytes, elapsed);

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            output_bytes,
            throughput_mb_s = throughput,
            attempts = invocation.attempts,
            "compression complete"
        );

        Ok(CompressOutcome {
            profile: invocation.profile,
            decider: plan.decider,
            attempts: invocation.attempts,
            output_bytes,
            elapsed,
            throughput_mb_s: throughput,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::TwoPassSizePolicy;
    use crate::invoke::RunOutput;
    use std::path::Path;
    use vidcompress_core::types::{HwAccel, ModeRequest, SpeedMode};

    /// Writes `bytes` to the output path (last argument) and succeeds,
    /// optionally after a delay.
    struct WritingRunner {
        bytes: usize,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ProcessRunner for WritingRunner {
        async fn run(&self, _program: &Path, args: &[String]) -> Result<RunOutput, TranscodeError> {
            tokio::time::sleep(self.delay).await;
            let out = args.last().expect("output path");
            tokio::fs::write(out, vec![0u8; self.bytes]).await?;
            Ok(RunOutput {
                success: true,
                diagnostics: String::new(),
            })
        }
    }

    fn transcoder(bytes: usize, delay: Duration, timeout: Duration) -> Transcoder {
        let config = TranscoderConfig {
            job_timeout: timeout,
            ..Default::default()
        };
        Transcoder::with_runner(
            config,
            Box::new(TwoPassSizePolicy),
            Arc::new(WritingRunner { bytes, delay }),
        )
    }

    fn job(dir: &Path, request: EncodeRequest, input_bytes: u64) -> CompressJob {
        CompressJob {
            request,
            input_path: dir.join("in.mp4"),
            output_path: dir.join("in_compressed.mp4"),
            input_bytes,
        }
    }

    #[tokio::test]
    async fn compress_reports_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let tc = transcoder(4096, Duration::ZERO, Duration::from_secs(5));
        let outcome = tc
            .compress(&job(dir.path(), EncodeRequest::default(), 300 * 1024 * 1024))
            .await
            .unwrap();
        assert_eq!(outcome.profile.mode, SpeedMode::UltraFast);
        assert_eq!(outcome.decider, ModeDecider::Auto);
        assert_eq!(outcome.output_bytes, 4096);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(tc.active(), 0);
    }

    #[tokio::test]
    async fn tiny_output_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let tc = transcoder(10, Duration::ZERO, Duration::from_secs(5));
        let err = tc
            .compress(&job(dir.path(), EncodeRequest::default(), 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::OutputInvalid(_)));
    }

    #[tokio::test]
    async fn slow_encode_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let tc = transcoder(4096, Duration::from_secs(5), Duration::from_millis(50));
        let request = EncodeRequest {
            mode: ModeRequest::Manual(SpeedMode::Fast),
            hw: HwAccel::None,
            ..Default::default()
        };
        let err = tc
            .compress(&job(dir.path(), request, 20 * 1024 * 1024))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscodeError::Timeout(_)));
    }

    #[test]
    fn throughput_in_megabytes_per_second() {
        let t = throughput_mb_s(10 * 1024 * 1024, Duration::from_secs(2));
        assert!((t - 5.0).abs() < f64::EPSILON);
        assert_eq!(throughput_mb_s(1024, Duration::ZERO), 0.0);
    }
}
