//! Ingestion service: orchestrates jobs and serves snapshot reads.

use std::sync::Arc;

use crate::domain::{DataType, JobState, MessageCountSnapshot};
use crate::error::PipelineError;
use crate::persistence::{ChainDirectoryStore, JobStateStore, SnapshotStore};
use crate::pipeline::{
    CheckpointedWeeklyJob, IngestionEngine, IngestionPlan, IngestionReport, PacingConfig,
    TimeWindowPaginator, WeeklyOutcome, reconcile_stale,
};
use crate::upstream::MessageApi;

/// The four job entry points plus snapshot reads, behind one service.
///
/// Reads never block on job failures: the latest persisted snapshot is
/// served regardless of job state.
#[derive(Debug, Clone)]
pub struct IngestionService {
    engine: IngestionEngine,
    weekly: CheckpointedWeeklyJob,
    snapshots: Arc<dyn SnapshotStore>,
    job_states: Arc<dyn JobStateStore>,
    staleness: chrono::Duration,
}

impl IngestionService {
    /// Wires the service from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fetcher: Arc<dyn MessageApi>,
        job_states: Arc<dyn JobStateStore>,
        snapshots: Arc<dyn SnapshotStore>,
        chains: Arc<dyn ChainDirectoryStore>,
        pacing: PacingConfig,
        page_ceiling: u32,
        min_bisect_window_secs: i64,
        staleness: chrono::Duration,
    ) -> Self {
        let paginator = TimeWindowPaginator::new(fetcher, min_bisect_window_secs);
        let engine = IngestionEngine::new(
            paginator.clone(),
            Arc::clone(&job_states),
            Arc::clone(&snapshots),
            Arc::clone(&chains),
            pacing.clone(),
            page_ceiling,
            staleness,
        );
        let weekly = CheckpointedWeeklyJob::new(
            paginator,
            Arc::clone(&job_states),
            Arc::clone(&snapshots),
            chains,
            pacing,
            page_ceiling,
            staleness,
        );
        Self {
            engine,
            weekly,
            snapshots,
            job_states,
            staleness,
        }
    }

    /// Runs the daily ingestion over the last 24 hours.
    ///
    /// # Errors
    ///
    /// See [`IngestionEngine::run`].
    pub async fn run_daily_ingestion(&self) -> Result<IngestionReport, PipelineError> {
        self.engine.run(IngestionPlan::daily()).await
    }

    /// Runs the whole last week in one pass (bulk variant).
    ///
    /// # Errors
    ///
    /// See [`IngestionEngine::run`].
    pub async fn run_weekly_bulk_ingestion(&self) -> Result<IngestionReport, PipelineError> {
        self.engine.run(IngestionPlan::weekly_bulk()).await
    }

    /// Advances the checkpointed weekly job.
    ///
    /// # Errors
    ///
    /// See [`CheckpointedWeeklyJob::advance`].
    pub async fn advance_weekly_checkpoint(&self) -> Result<WeeklyOutcome, PipelineError> {
        self.weekly.advance().await
    }

    /// Returns the most recent snapshot for the data type.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoSnapshot`] when none was ever persisted,
    /// or [`PipelineError::Persistence`] on storage failure.
    pub async fn latest_snapshot(
        &self,
        data_type: DataType,
    ) -> Result<MessageCountSnapshot, PipelineError> {
        self.snapshots
            .latest(data_type)
            .await?
            .ok_or_else(|| PipelineError::NoSnapshot(data_type.to_string()))
    }

    /// Returns up to `limit` snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    pub async fn snapshot_history(
        &self,
        data_type: DataType,
        limit: u32,
    ) -> Result<Vec<MessageCountSnapshot>, PipelineError> {
        self.snapshots.history(data_type, limit).await
    }

    /// Returns the current job state record, reconciling staleness on read.
    ///
    /// Any observer may perform the stale → failed transition; it is
    /// idempotent, so racing observers reach the same terminal record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    pub async fn job_state(
        &self,
        data_type: DataType,
    ) -> Result<Option<JobState>, PipelineError> {
        let Some(mut state) = self.job_states.load(data_type).await? else {
            return Ok(None);
        };
        reconcile_stale(&self.job_states, &mut state, self.staleness).await?;
        Ok(Some(state))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::JobStatus;
    use crate::pipeline::testing::{
        MemoryJobStateStore, MemorySnapshotStore, ScriptedApi, StaticChains,
    };

    fn service(job_states: Arc<MemoryJobStateStore>) -> IngestionService {
        IngestionService::new(
            ScriptedApi::new(vec![]),
            job_states,
            MemorySnapshotStore::new(),
            StaticChains::new(vec![]),
            PacingConfig::immediate(),
            10,
            7200,
            chrono::Duration::minutes(10),
        )
    }

    #[tokio::test]
    async fn latest_snapshot_without_history_is_no_snapshot() {
        let service = service(MemoryJobStateStore::new());
        let result = service.latest_snapshot(DataType::Daily).await;
        assert!(matches!(result, Err(PipelineError::NoSnapshot(_))));
    }

    #[tokio::test]
    async fn reading_job_state_reconciles_staleness_once() {
        let mut stale = JobState::start(DataType::Daily, 6);
        stale.last_updated_at = Utc::now() - chrono::Duration::minutes(30);
        let job_states = MemoryJobStateStore::with_state(stale);
        let service = service(Arc::clone(&job_states));

        let Ok(Some(first)) = service.job_state(DataType::Daily).await else {
            panic!("state exists");
        };
        assert_eq!(first.status, JobStatus::Failed);
        let first_error = first.error.clone();
        assert!(first_error.is_some());

        // A second reconciliation attempt is a no-op: same terminal record,
        // no double error append.
        let Ok(Some(second)) = service.job_state(DataType::Daily).await else {
            panic!("state exists");
        };
        assert_eq!(second.status, JobStatus::Failed);
        assert_eq!(
            second.error.as_ref().map(|e| e.message.clone()),
            first_error.map(|e| e.message)
        );
        assert_eq!(second.last_updated_at, first.last_updated_at);
    }
}
