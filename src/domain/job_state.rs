//! Persisted job checkpoint record.
//!
//! One live record exists per [`DataType`]. The record doubles as a
//! cooperative lock: a fresh `InProgress` record blocks a second run, a
//! stale one may be flipped to `Failed` by any observer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::snapshot::{ChainPairCount, DataType};

/// Lifecycle state of an ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The job is running (or crashed without cleanup — see staleness).
    InProgress,
    /// The job finished and its snapshot was persisted.
    Completed,
    /// The job hit an unrecoverable error or was reconciled as stale.
    Failed,
}

/// Progress counters, updated after every completed unit of work.
///
/// A "unit" is a chunk for the daily job and a day for the weekly job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct JobProgress {
    /// 1-based index of the unit being processed next.
    pub current_unit: u32,
    /// Total units in this run.
    pub total_units: u32,
    /// Units fully processed so far.
    pub units_completed: u32,
    /// Messages collected across completed units.
    pub messages_collected: u64,
}

/// Aggregated result of one completed day of the checkpointed weekly job.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DayResult {
    /// 1-based day index within the week.
    pub day: u32,
    /// Messages collected for this day.
    pub message_count: u64,
    /// Per-pair counts for this day.
    pub pair_counts: Vec<ChainPairCount>,
}

/// Captured failure detail on a [`JobStatus::Failed`] record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobError {
    /// Human-readable failure summary.
    pub message: String,
    /// Optional detail, e.g. per-chunk error list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// The persisted checkpoint record for one ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    /// Identifier of this run, regenerated when a run starts fresh.
    pub run_id: Uuid,
    /// Which ingestion variant owns this record.
    pub data_type: DataType,
    /// Lifecycle state.
    pub status: JobStatus,
    /// When this run started.
    pub started_at: DateTime<Utc>,
    /// Heartbeat: bumped on every persisted progress update.
    pub last_updated_at: DateTime<Utc>,
    /// Progress counters.
    pub progress: JobProgress,
    /// Per-day partial results (weekly only); cleared on completion.
    #[serde(default)]
    pub partial_results: Vec<DayResult>,
    /// Failure detail, present only on failed records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobState {
    /// Creates a fresh `InProgress` record starting at unit 1.
    #[must_use]
    pub fn start(data_type: DataType, total_units: u32) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            data_type,
            status: JobStatus::InProgress,
            started_at: now,
            last_updated_at: now,
            progress: JobProgress {
                current_unit: 1,
                total_units,
                units_completed: 0,
                messages_collected: 0,
            },
            partial_results: Vec::new(),
            error: None,
        }
    }

    /// Whether this record has gone without a heartbeat for longer than
    /// `threshold`. Only meaningful for `InProgress` records.
    #[must_use]
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.status == JobStatus::InProgress && Utc::now() - self.last_updated_at > threshold
    }

    /// Bumps the heartbeat timestamp.
    pub fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }

    /// Marks the record failed with the given error, bumping the heartbeat.
    pub fn fail(&mut self, message: String, details: Option<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(JobError { message, details });
        self.touch();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn fresh_record_is_not_stale() {
        let state = JobState::start(DataType::Daily, 6);
        assert!(!state.is_stale(Duration::minutes(10)));
    }

    #[test]
    fn old_heartbeat_is_stale_only_in_progress() {
        let mut state = JobState::start(DataType::Weekly, 7);
        state.last_updated_at = Utc::now() - Duration::minutes(30);
        assert!(state.is_stale(Duration::minutes(10)));

        state.status = JobStatus::Completed;
        assert!(!state.is_stale(Duration::minutes(10)));
    }

    #[test]
    fn fail_records_error_and_touches() {
        let mut state = JobState::start(DataType::Daily, 6);
        let before = state.last_updated_at;
        state.fail("no messages".to_string(), None);
        assert_eq!(state.status, JobStatus::Failed);
        assert!(state.error.is_some());
        assert!(state.last_updated_at >= before);
    }
}
