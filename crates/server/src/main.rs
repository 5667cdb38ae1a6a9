use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vidcompress_server::config::ServerConfig;
use vidcompress_server::state::AppState;
use vidcompress_server::store::{MemoryResultStore, ResultStore, remove_outputs};
use vidcompress_transcoder::decision::policy_by_name;
use vidcompress_transcoder::gpu;
use vidcompress_transcoder::service::Transcoder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if std::env::var("VIDCOMPRESS_LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = ServerConfig::from_env();

    std::fs::create_dir_all(&config.transcoder.work_dir)
        .context("failed to create work dir")?;
    info!(work_dir = %config.transcoder.work_dir.display(), "work dir ready");

    let policy = match policy_by_name(&config.mode_policy) {
        Some(p) => p,
        None => {
            warn!(policy = %config.mode_policy, "unknown mode policy, using two_pass");
            policy_by_name("two_pass").context("two_pass policy missing")?
        }
    };

    let encoders = gpu::detect(&config.transcoder.ffmpeg_path).await;
    if !encoders.ffmpeg {
        warn!(ffmpeg = %config.transcoder.ffmpeg_path.display(), "ffmpeg not available, compression will fail");
    }

    let transcoder = Arc::new(Transcoder::new(config.transcoder.clone(), policy));
    let results: Arc<dyn ResultStore> = Arc::new(MemoryResultStore::new(
        config.result_capacity,
        config.result_ttl,
    ));

    // Spawn expired result cleanup task
    {
        let results = results.clone();
        let every = (config.result_ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(every).await;
                let expired = results.purge_expired().await;
                if !expired.is_empty() {
                    info!(count = expired.len(), "purging expired results");
                    remove_outputs(&expired).await;
                }
            }
        });
    }

    let app_state = AppState {
        transcoder,
        results,
        encoders,
        max_upload_bytes: config.max_upload_bytes,
    };

    let app = vidcompress_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    info!(
        addr = %config.bind_addr,
        policy = %config.mode_policy,
        max_transcodes = config.transcoder.max_concurrent,
        "server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
