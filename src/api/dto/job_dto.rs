//! DTOs for job observability and trigger endpoints.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{JobError, JobProgress, JobState, JobStatus};

/// One job state record as served to clients.
///
/// Partial results are summarized, not embedded — they exist for
/// resumability, not for dashboard consumption.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStateDto {
    /// Identifier of this run.
    pub run_id: Uuid,
    /// Data type the record belongs to.
    pub data_type: String,
    /// Lifecycle state.
    pub status: JobStatus,
    /// When this run started.
    pub started_at: DateTime<Utc>,
    /// Last heartbeat.
    pub last_updated_at: DateTime<Utc>,
    /// Progress counters.
    pub progress: JobProgress,
    /// Number of checkpointed partial day results.
    pub partial_result_count: usize,
    /// Failure detail, if the job failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl From<JobState> for JobStateDto {
    fn from(state: JobState) -> Self {
        Self {
            run_id: state.run_id,
            data_type: state.data_type.to_string(),
            status: state.status,
            started_at: state.started_at,
            last_updated_at: state.last_updated_at,
            progress: state.progress,
            partial_result_count: state.partial_results.len(),
            error: state.error,
        }
    }
}

/// Envelope for the job state endpoint; `job` is absent before the first
/// run of a data type.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStateResponse {
    /// Current record, if any.
    pub job: Option<JobStateDto>,
}

/// Acknowledgement for job trigger endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobTriggerResponse {
    /// Data type of the triggered job.
    pub data_type: String,
    /// Human-readable acknowledgement.
    pub message: String,
}
