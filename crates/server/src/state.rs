use std::sync::Arc;

use vidcompress_transcoder::gpu::EncoderCapabilities;
use vidcompress_transcoder::service::Transcoder;

use crate::store::ResultStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub transcoder: Arc<Transcoder>,
    pub results: Arc<dyn ResultStore>,
    pub encoders: EncoderCapabilities,
    pub max_upload_bytes: usize,
}
