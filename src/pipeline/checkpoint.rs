//! Checkpointed day-at-a-time weekly ingestion.
//!
//! The weekly job processes one 24-hour block at a time and persists its
//! checkpoint record after every day, so a crash or redeploy resumes from
//! the last completed day instead of refetching the whole week. Advancing
//! is an explicit loop over the persisted day cursor, not recursion.

use std::sync::Arc;

use chrono::Utc;

use super::aggregator;
use super::engine::{IngestionReport, PacingConfig};
use super::paginator::TimeWindowPaginator;
use crate::domain::{
    DataType, DayResult, JobState, JobStatus, MessageCountSnapshot, TimeWindow,
};
use crate::error::PipelineError;
use crate::persistence::{ChainDirectoryStore, JobStateStore, SnapshotStore};

/// Days per week, one per checkpoint step.
const DAYS: u32 = 7;
/// Sub-chunk size within one day, in hours.
const DAY_CHUNK_HOURS: u32 = 4;

/// Outcome of one [`CheckpointedWeeklyJob::advance`] invocation.
#[derive(Debug)]
pub enum WeeklyOutcome {
    /// A fresh in-progress record exists; nothing was done.
    AlreadyRunning,
    /// The week was driven to completion (possibly resuming mid-week).
    Completed(IngestionReport),
}

/// The resumable weekly ingestion job.
#[derive(Debug, Clone)]
pub struct CheckpointedWeeklyJob {
    paginator: TimeWindowPaginator,
    job_states: Arc<dyn JobStateStore>,
    snapshots: Arc<dyn SnapshotStore>,
    chains: Arc<dyn ChainDirectoryStore>,
    pacing: PacingConfig,
    page_ceiling: u32,
    staleness: chrono::Duration,
}

impl CheckpointedWeeklyJob {
    /// Creates the job over the given collaborators.
    #[must_use]
    pub fn new(
        paginator: TimeWindowPaginator,
        job_states: Arc<dyn JobStateStore>,
        snapshots: Arc<dyn SnapshotStore>,
        chains: Arc<dyn ChainDirectoryStore>,
        pacing: PacingConfig,
        page_ceiling: u32,
        staleness: chrono::Duration,
    ) -> Self {
        Self {
            paginator,
            job_states,
            snapshots,
            chains,
            pacing,
            page_ceiling,
            staleness,
        }
    }

    /// Advances the weekly job: claims or resumes the checkpoint record and
    /// processes days until day 7 completes.
    ///
    /// Idempotent against concurrent invocations: a fresh in-progress
    /// record yields [`WeeklyOutcome::AlreadyRunning`] without touching
    /// anything. A stale record is reconciled to failed and then resumed
    /// from its recorded day; completed days are never reprocessed.
    ///
    /// # Errors
    ///
    /// Propagates persistence failures; the record is marked failed on a
    /// best-effort basis first so a later invocation can resume.
    pub async fn advance(&self) -> Result<WeeklyOutcome, PipelineError> {
        let mut state = match self.claim().await? {
            Some(state) => state,
            None => return Ok(WeeklyOutcome::AlreadyRunning),
        };

        match self.run_days(&mut state).await {
            Ok(report) => Ok(WeeklyOutcome::Completed(report)),
            Err(err) => {
                if state.status == JobStatus::InProgress {
                    state.fail(err.to_string(), None);
                    if let Err(persist_err) = self.job_states.upsert(&state).await {
                        tracing::error!(error = %persist_err, "failed to persist job failure");
                    }
                }
                Err(err)
            }
        }
    }

    /// Claims the weekly record: `None` means a fresh run is already live.
    async fn claim(&self) -> Result<Option<JobState>, PipelineError> {
        let state = match self.job_states.load(DataType::Weekly).await? {
            Some(mut existing) if existing.status == JobStatus::InProgress => {
                if !super::reconcile_stale(&self.job_states, &mut existing, self.staleness).await? {
                    tracing::debug!("weekly job already in progress, skipping");
                    return Ok(None);
                }
                // Stale record flipped to failed; resume its progress.
                Self::resume(existing)
            }
            Some(existing) if Self::resumable(&existing) => {
                tracing::info!(
                    day = existing.progress.current_unit,
                    days_completed = existing.progress.units_completed,
                    "resuming weekly job from checkpoint"
                );
                Self::resume(existing)
            }
            _ => JobState::start(DataType::Weekly, DAYS),
        };

        self.job_states.upsert(&state).await?;
        Ok(Some(state))
    }

    /// Whether a terminal record still carries progress worth resuming.
    ///
    /// `units_completed == DAYS` is included: a failure during finalization
    /// leaves all seven checkpointed days behind, and resuming goes straight
    /// to the merge instead of refetching the week.
    fn resumable(state: &JobState) -> bool {
        state.status == JobStatus::Failed
            && state.progress.units_completed > 0
            && state.progress.units_completed <= DAYS
    }

    /// Reopens a record for resumption, keeping run id and partial results.
    fn resume(mut state: JobState) -> JobState {
        state.status = JobStatus::InProgress;
        state.error = None;
        state.progress.current_unit = state.progress.units_completed + 1;
        state.touch();
        state
    }

    async fn run_days(&self, state: &mut JobState) -> Result<IngestionReport, PipelineError> {
        let directory = self.chains.load_directory().await?;
        let now = Utc::now();

        let mut day = state.progress.current_unit.max(1);
        while day <= DAYS {
            let day_messages = {
                let mut collected = Vec::new();
                let chunks = 24 / DAY_CHUNK_HOURS;
                for chunk in 0..chunks {
                    let start_hours = (day - 1) * 24 + (chunk + 1) * DAY_CHUNK_HOURS;
                    let end_hours = (day - 1) * 24 + chunk * DAY_CHUNK_HOURS;
                    let window = TimeWindow::hours_ago(now, start_hours, end_hours)?;

                    match self.paginator.fetch_range(window, self.page_ceiling).await {
                        Ok(fetch) => collected.extend(fetch.messages),
                        Err(err) => {
                            tracing::error!(
                                day,
                                chunk = chunk + 1,
                                error = %err,
                                "weekly sub-chunk failed, continuing"
                            );
                            if !self.pacing.chunk_error_delay.is_zero() {
                                tokio::time::sleep(self.pacing.chunk_error_delay).await;
                            }
                            continue;
                        }
                    }
                    if chunk + 1 < chunks && !self.pacing.chunk_delay.is_zero() {
                        tokio::time::sleep(self.pacing.chunk_delay).await;
                    }
                }
                collected
            };

            // Empty days still complete: the job must not stall on a quiet
            // day.
            let pair_counts = aggregator::aggregate(&day_messages, &directory);
            let message_count = day_messages.len() as u64;
            tracing::info!(day, messages = message_count, "weekly day processed");

            state.partial_results.push(DayResult {
                day,
                message_count,
                pair_counts,
            });
            state.progress.units_completed = day;
            state.progress.current_unit = day + 1;
            state.progress.messages_collected += message_count;
            state.touch();
            self.job_states.upsert(state).await?;

            if day < DAYS && !self.pacing.day_delay.is_zero() {
                tokio::time::sleep(self.pacing.day_delay).await;
            }
            day += 1;
        }

        self.finalize(state).await
    }

    /// Merges the week's partial results into the final snapshot and closes
    /// out the checkpoint record.
    async fn finalize(&self, state: &mut JobState) -> Result<IngestionReport, PipelineError> {
        let merged = aggregator::merge_counts(
            state.partial_results.iter().map(|r| r.pair_counts.clone()),
        );
        let snapshot = MessageCountSnapshot::from_counts(
            DataType::Weekly,
            DataType::Weekly.window_hours(),
            merged,
        );
        self.snapshots.append(&snapshot).await?;

        state.status = JobStatus::Completed;
        state.partial_results.clear();
        state.touch();
        self.job_states.upsert(state).await?;

        // Read back the completion write: defends against write-visibility
        // races where a concurrent observer's update landed after ours.
        match self.job_states.load(DataType::Weekly).await? {
            Some(persisted) if persisted.status == JobStatus::Completed => {}
            _ => {
                tracing::warn!("completion write not visible on read-back, repairing");
                self.job_states.upsert(state).await?;
            }
        }

        let report = IngestionReport {
            data_type: DataType::Weekly,
            total_messages: snapshot.total_messages,
            chain_pair_count: snapshot.message_counts.len(),
            failed_chunks: 0,
        };
        tracing::info!(
            total_messages = report.total_messages,
            chain_pairs = report.chain_pair_count,
            "weekly job completed"
        );
        Ok(report)
    }
}
