// Web server module
// Handles the HTTP API: background removal, health and metadata endpoints

mod app;
mod error;
mod extract_request_data;
mod handlers;
mod listeners;
mod models;

pub use app::create_app;
pub use listeners::create_listener;

use crate::config::Settings;
use crate::pipeline::BackgroundRemovalService;
use crate::segmentation::Segmenter;
use std::sync::Arc;

// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub service: Arc<BackgroundRemovalService>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, segmenter: Arc<dyn Segmenter>) -> Self {
        let service = Arc::new(BackgroundRemovalService::new(&settings, segmenter));
        Self { settings, service }
    }

    /// Transport-level body limit. Twice the upload limit, so that moderately
    /// oversized files still reach the validator and get its specific message.
    pub fn body_limit(&self) -> usize {
        let max_file_size = usize::try_from(self.settings.max_file_size_bytes()).unwrap_or(usize::MAX);
        max_file_size
            .saturating_mul(2)
            .saturating_add(MULTIPART_OVERHEAD_BYTES)
    }
}
