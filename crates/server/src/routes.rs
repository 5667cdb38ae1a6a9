use std::collections::HashMap;
use std::path::Path as FsPath;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span};
use vidcompress_core::error::ApiError;
use vidcompress_core::types::{EncodeRequest, SpeedMode};
use vidcompress_transcoder::gpu::EncoderCapabilities;
use vidcompress_transcoder::invoke::output_path_for;
use vidcompress_transcoder::record::ResultRecord;
use vidcompress_transcoder::service::{CompressJob, CompressOutcome};

use crate::download;
use crate::error::AppError;
use crate::pages;
use crate::state::AppState;
use crate::store::{new_result_id, remove_outputs};
use crate::upload::{self, TempFile, sanitize_file_name};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(upload_page))
        .route("/compress", get(upload_page).post(compress))
        .route("/dl/{id}", get(download_result))
        .route("/meta/{id}", get(result_meta))
        .route("/health", get(health))
        .route("/api-docs", get(api_docs))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

async fn upload_page() -> Html<String> {
    Html(pages::upload_page())
}

async fn api_docs() -> Html<String> {
    Html(pages::api_docs_page())
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// API callers get the file itself; browsers get a result page.
fn wants_file(
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    fields: &HashMap<String, String>,
) -> bool {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let flag = |m: &HashMap<String, String>| m.get("api").is_some_and(|v| v.trim() == "1");
    accept.contains("application/octet-stream") || flag(query) || flag(fields)
}

/// `<original stem>_compressed<ext>`, restricted to safe characters.
fn download_name(original: &str, extension: &str) -> String {
    output_path_for(FsPath::new(&sanitize_file_name(original)), extension)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("output_compressed{extension}"))
}

fn outcome_headers(outcome: &CompressOutcome, input_bytes: u64) -> Vec<(&'static str, String)> {
    vec![
        ("x-mode", outcome.profile.mode.to_string()),
        ("x-mode-decider", outcome.decider.to_string()),
        ("x-encode-duration-ms", outcome.elapsed.as_millis().to_string()),
        ("x-throughput-mbps", format!("{:.4}", outcome.throughput_mb_s)),
        ("x-input-bytes", input_bytes.to_string()),
        ("x-output-bytes", outcome.output_bytes.to_string()),
        ("x-resolution", outcome.profile.resolution_label()),
        ("x-video-codec", outcome.profile.video_codec.to_string()),
        ("x-audio-codec", outcome.profile.audio_codec.to_string()),
        ("x-hw", outcome.profile.hw.to_string()),
    ]
}

async fn compress(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let request_id = uuid::Uuid::new_v4().simple().to_string();
    let span = info_span!("compress", %request_id);
    run_compress(state, query, headers, multipart)
        .instrument(span)
        .await
}

async fn run_compress(
    state: AppState,
    query: HashMap<String, String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let work_dir = state.transcoder.config().work_dir.clone();
    let upload = upload::receive(multipart, &work_dir).await?;
    let request = EncodeRequest::from_fields(&upload.fields);
    let api_mode = wants_file(&headers, &query, &upload.fields);
    info!(
        file = %upload.original_name,
        input_bytes = upload.bytes,
        api_mode,
        "upload received"
    );

    let extension = request.container.extension();
    let output = TempFile::new(output_path_for(upload.file.path(), extension));
    let job = CompressJob {
        request,
        input_path: upload.file.path().to_path_buf(),
        output_path: output.path().to_path_buf(),
        input_bytes: upload.bytes,
    };
    let outcome = state.transcoder.compress(&job).await?;
    let name = download_name(&upload.original_name, extension);

    if api_mode {
        let extra = outcome_headers(&outcome, upload.bytes);
        let response = download::attachment(output.path(), &name, &extra).await?;
        // The open handle keeps streaming after the unlink.
        output.remove().await;
        upload.file.remove().await;
        return Ok(response);
    }

    let record = ResultRecord::new(
        new_result_id(),
        output.keep(),
        upload.bytes,
        &outcome,
    );
    upload.file.remove().await;
    let evicted = state.results.put(record.clone()).await;
    remove_outputs(&evicted).await;
    info!(id = %record.id, evicted = evicted.len(), "result stored");

    Ok(Html(pages::result_page(&record, &upload.original_name, &name)).into_response())
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DownloadQuery {
    name: Option<String>,
}

async fn lookup(state: &AppState, id: &str) -> Result<ResultRecord, AppError> {
    state
        .results
        .get(id)
        .await
        .ok_or_else(|| AppError(ApiError::NotFound(format!("result {id} not found or expired"))))
}

async fn download_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let record = lookup(&state, &id).await?;
    let name = q
        .name
        .as_deref()
        .map(sanitize_file_name)
        .unwrap_or_else(|| record.file_name.clone());
    download::attachment(&record.file_path, &name, &[]).await
}

async fn result_meta(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultRecord>, AppError> {
    Ok(Json(lookup(&state, &id).await?))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthDefaults {
    speed: &'static str,
    codec: &'static str,
    audio: &'static str,
    resolution: &'static str,
    hw: &'static str,
    container: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
    modes: Vec<&'static str>,
    defaults: HealthDefaults,
    hardware: Vec<&'static str>,
    encoders: EncoderCapabilities,
    mode_policy: &'static str,
    active_jobs: usize,
    stored_results: usize,
    ui_routes: Vec<&'static str>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let defaults = EncodeRequest::default();
    let modes = std::iter::once("ai")
        .chain(SpeedMode::ALL.iter().map(|m| m.as_str()))
        .collect();

    Json(HealthResponse {
        ok: true,
        service: "vidcompress",
        version: env!("CARGO_PKG_VERSION"),
        modes,
        defaults: HealthDefaults {
            speed: "ai",
            codec: defaults.video_codec.as_str(),
            audio: defaults.audio_codec.as_str(),
            resolution: defaults.resolution.as_str(),
            hw: defaults.hw.as_str(),
            container: defaults.container.extension(),
        },
        hardware: state.encoders.hardware().iter().map(|h| h.as_str()).collect(),
        encoders: state.encoders.clone(),
        mode_policy: state.transcoder.policy_name(),
        active_jobs: state.transcoder.active(),
        stored_results: state.results.len().await,
        ui_routes: vec!["/", "/compress", "/dl/{id}", "/meta/{id}", "/api-docs", "/health"],
    })
}
