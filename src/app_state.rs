//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::IngestionService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingestion service driving jobs and snapshot reads.
    pub service: Arc<IngestionService>,
}
