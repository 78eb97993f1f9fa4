//! HTTP surface: snapshot reads, job state, and job triggers.
//!
//! Resource routes live under `/api/v1`; system routes (health) sit at the
//! root so probes stay stable across API versions.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Assembles the full application router.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
