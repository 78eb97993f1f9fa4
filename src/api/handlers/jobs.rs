//! Job observability and trigger handlers.
//!
//! Triggers spawn the job and return 202 immediately; failures surface in
//! the job state record and the logs, never as a hung request.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};

use crate::api::dto::{JobStateDto, JobStateResponse, JobTriggerResponse};
use crate::app_state::AppState;
use crate::domain::DataType;
use crate::error::{ErrorResponse, PipelineError};

/// `GET /jobs/{data_type}` — Current job state record.
///
/// Reading reconciles staleness: a record whose heartbeat stopped is
/// flipped to failed before being returned.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidRequest`] for an unknown data type.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{data_type}",
    tag = "Jobs",
    summary = "Current job state",
    description = "Returns the live job state record for the data type, reconciling stale records on read.",
    params(("data_type" = String, Path, description = "daily or weekly")),
    responses(
        (status = 200, description = "Job state (absent before the first run)", body = JobStateResponse),
        (status = 400, description = "Unknown data type", body = ErrorResponse),
    )
)]
pub async fn job_state(
    State(state): State<AppState>,
    Path(data_type): Path<String>,
) -> Result<impl IntoResponse, PipelineError> {
    let data_type: DataType = data_type.parse()?;
    let job = state.service.job_state(data_type).await?;
    Ok(Json(JobStateResponse {
        job: job.map(JobStateDto::from),
    }))
}

/// `POST /jobs/daily/run` — Trigger the daily ingestion.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/daily/run",
    tag = "Jobs",
    summary = "Trigger daily ingestion",
    responses(
        (status = 202, description = "Job spawned", body = JobTriggerResponse),
    )
)]
pub async fn trigger_daily(State(state): State<AppState>) -> impl IntoResponse {
    let service = std::sync::Arc::clone(&state.service);
    tokio::spawn(async move {
        match service.run_daily_ingestion().await {
            Ok(report) => tracing::info!(
                total_messages = report.total_messages,
                "triggered daily ingestion finished"
            ),
            Err(err) => tracing::warn!(error = %err, "triggered daily ingestion failed"),
        }
    });
    accepted(DataType::Daily, "daily ingestion started")
}

/// `POST /jobs/weekly/run` — Trigger the bulk weekly ingestion.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/weekly/run",
    tag = "Jobs",
    summary = "Trigger bulk weekly ingestion",
    responses(
        (status = 202, description = "Job spawned", body = JobTriggerResponse),
    )
)]
pub async fn trigger_weekly_bulk(State(state): State<AppState>) -> impl IntoResponse {
    let service = std::sync::Arc::clone(&state.service);
    tokio::spawn(async move {
        match service.run_weekly_bulk_ingestion().await {
            Ok(report) => tracing::info!(
                total_messages = report.total_messages,
                "triggered weekly bulk ingestion finished"
            ),
            Err(err) => tracing::warn!(error = %err, "triggered weekly bulk ingestion failed"),
        }
    });
    accepted(DataType::Weekly, "weekly bulk ingestion started")
}

/// `POST /jobs/weekly/advance` — Advance the checkpointed weekly job.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/weekly/advance",
    tag = "Jobs",
    summary = "Advance the checkpointed weekly job",
    responses(
        (status = 202, description = "Advance spawned", body = JobTriggerResponse),
    )
)]
pub async fn trigger_weekly_advance(State(state): State<AppState>) -> impl IntoResponse {
    let service = std::sync::Arc::clone(&state.service);
    tokio::spawn(async move {
        match service.advance_weekly_checkpoint().await {
            Ok(outcome) => tracing::info!(?outcome, "weekly checkpoint advance finished"),
            Err(err) => tracing::warn!(error = %err, "weekly checkpoint advance failed"),
        }
    });
    accepted(DataType::Weekly, "weekly checkpoint advance started")
}

fn accepted(data_type: DataType, message: &str) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(JobTriggerResponse {
            data_type: data_type.to_string(),
            message: message.to_string(),
        }),
    )
}

/// Job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{data_type}", get(job_state))
        .route("/jobs/daily/run", post(trigger_daily))
        .route("/jobs/weekly/run", post(trigger_weekly_bulk))
        .route("/jobs/weekly/advance", post(trigger_weekly_advance))
}
