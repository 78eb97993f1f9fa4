//! Snapshot read handlers: latest and history.

use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;

use crate::api::dto::{HistoryParams, LatestParams, SnapshotDto};
use crate::app_state::AppState;
use crate::domain::DataType;
use crate::error::{ErrorResponse, PipelineError};

/// `GET /messages` — Latest message count snapshot.
///
/// Never blocks on job state: the most recent successful snapshot is
/// served regardless of any running or failed job.
///
/// # Errors
///
/// Returns [`PipelineError::NoSnapshot`] when no ingestion has ever
/// completed for the data type.
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    summary = "Latest message count snapshot",
    description = "Returns the most recent per-chain-pair message counts for the given data type.",
    params(LatestParams),
    responses(
        (status = 200, description = "Latest snapshot", body = SnapshotDto),
        (status = 404, description = "No snapshot persisted yet", body = ErrorResponse),
    )
)]
pub async fn latest_snapshot(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Result<impl IntoResponse, PipelineError> {
    let data_type: DataType = params.data_type.parse()?;
    let snapshot = state.service.latest_snapshot(data_type).await?;
    Ok(Json(SnapshotDto::from(snapshot)))
}

/// `GET /messages/history` — Snapshot history, newest first.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRequest`] for an unknown data type.
#[utoipa::path(
    get,
    path = "/api/v1/messages/history",
    tag = "Messages",
    summary = "Snapshot history",
    description = "Returns up to `limit` snapshots for the data type, newest first.",
    params(HistoryParams),
    responses(
        (status = 200, description = "Snapshot history", body = Vec<SnapshotDto>),
        (status = 400, description = "Unknown data type", body = ErrorResponse),
    )
)]
pub async fn snapshot_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, PipelineError> {
    let data_type: DataType = params.data_type.parse()?;
    let snapshots = state
        .service
        .snapshot_history(data_type, params.clamped_limit())
        .await?;
    let dtos: Vec<SnapshotDto> = snapshots.into_iter().map(SnapshotDto::from).collect();
    Ok(Json(dtos))
}

/// Message snapshot routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages", get(latest_snapshot))
        .route("/messages/history", get(snapshot_history))
}
