//! Chunked ingestion engine.
//!
//! One parameterized engine drives both the daily run and the bulk weekly
//! run: the span is split into fixed-size chunks, each chunk is fetched
//! through the paginator with pacing delays in between, chunk failures are
//! recorded without aborting the run, and the surviving messages become one
//! persisted snapshot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::aggregator;
use super::paginator::TimeWindowPaginator;
use crate::domain::{DataType, JobState, JobStatus, MessageCountSnapshot, TeleporterMessage, TimeWindow};
use crate::error::PipelineError;
use crate::persistence::{ChainDirectoryStore, JobStateStore, SnapshotStore};

/// Pacing delays between units of work. A deliberate throttle against
/// upstream rate limiting, not a performance knob.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    /// Delay between successful chunk fetches.
    pub chunk_delay: Duration,
    /// Longer delay after a failed chunk before continuing.
    pub chunk_error_delay: Duration,
    /// Delay between day steps of the checkpointed weekly job.
    pub day_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            chunk_delay: Duration::from_secs(8),
            chunk_error_delay: Duration::from_secs(10),
            day_delay: Duration::from_secs(8),
        }
    }
}

impl PacingConfig {
    /// Zero delays, for tests.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            chunk_delay: Duration::ZERO,
            chunk_error_delay: Duration::ZERO,
            day_delay: Duration::ZERO,
        }
    }
}

/// Shape of one ingestion run: which span, in which chunk sizes.
#[derive(Debug, Clone, Copy)]
pub struct IngestionPlan {
    /// Data type the run produces a snapshot for.
    pub data_type: DataType,
    /// Total span to ingest, in hours.
    pub total_hours: u32,
    /// Chunk size, in hours. Must divide `total_hours`.
    pub chunk_hours: u32,
}

impl IngestionPlan {
    /// The daily run: 24 hours in 6 chunks of 4.
    #[must_use]
    pub const fn daily() -> Self {
        Self {
            data_type: DataType::Daily,
            total_hours: 24,
            chunk_hours: 4,
        }
    }

    /// The bulk weekly run: 168 hours in 7 chunks of 24.
    #[must_use]
    pub const fn weekly_bulk() -> Self {
        Self {
            data_type: DataType::Weekly,
            total_hours: 168,
            chunk_hours: 24,
        }
    }

    /// Number of chunks in the run.
    #[must_use]
    pub const fn chunk_count(&self) -> u32 {
        self.total_hours / self.chunk_hours
    }
}

/// Summary of a finished ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// Which data type was ingested.
    pub data_type: DataType,
    /// Total messages collected across all chunks.
    pub total_messages: u64,
    /// Number of distinct chain pairs in the snapshot.
    pub chain_pair_count: usize,
    /// Chunks that failed and were skipped.
    pub failed_chunks: u32,
}

/// Sequential chunk-by-chunk ingestion over one plan.
#[derive(Debug, Clone)]
pub struct IngestionEngine {
    paginator: TimeWindowPaginator,
    job_states: Arc<dyn JobStateStore>,
    snapshots: Arc<dyn SnapshotStore>,
    chains: Arc<dyn ChainDirectoryStore>,
    pacing: PacingConfig,
    page_ceiling: u32,
    staleness: chrono::Duration,
}

impl IngestionEngine {
    /// Creates an engine over the given collaborators.
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

    /// Runs one ingestion pass over the plan's span.
    ///
    /// Chunk-level errors are recorded and skipped; the run fails only when
    /// every chunk came back empty. On success one snapshot is appended and
    /// the job state record is marked completed.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::JobAlreadyRunning`] when a fresh in-progress
    ///   record exists for the same data type.
    /// - [`PipelineError::NoDataFound`] when zero messages were collected.
    /// - [`PipelineError::Persistence`] on storage failures.
    pub async fn run(&self, plan: IngestionPlan) -> Result<IngestionReport, PipelineError> {
        let mut state = self.claim(plan).await?;

        match self.run_chunks(plan, &mut state).await {
            Ok(report) => Ok(report),
            Err(err) => {
                // Best-effort failure record; the original error wins.
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

    /// Claims the job state record for this run.
    ///
    /// A fresh in-progress record blocks the run; a stale one is reconciled
    /// to failed and superseded.
    async fn claim(&self, plan: IngestionPlan) -> Result<JobState, PipelineError> {
        if let Some(mut existing) = self.job_states.load(plan.data_type).await? {
            if existing.status == JobStatus::InProgress
                && !super::reconcile_stale(&self.job_states, &mut existing, self.staleness).await?
            {
                return Err(PipelineError::JobAlreadyRunning(
                    plan.data_type.to_string(),
                ));
            }
        }

        let state = JobState::start(plan.data_type, plan.chunk_count());
        self.job_states.upsert(&state).await?;
        tracing::info!(
            data_type = %plan.data_type,
            run_id = %state.run_id,
            chunks = plan.chunk_count(),
            "ingestion run started"
        );
        Ok(state)
    }

    async fn run_chunks(
        &self,
        plan: IngestionPlan,
        state: &mut JobState,
    ) -> Result<IngestionReport, PipelineError> {
        let directory = self.chains.load_directory().await?;
        let now = Utc::now();
        let chunks = plan.chunk_count();

        let mut messages: Vec<TeleporterMessage> = Vec::new();
        let mut chunk_errors: Vec<String> = Vec::new();

        for chunk in 0..chunks {
            let window = TimeWindow::hours_ago(
                now,
                (chunk + 1) * plan.chunk_hours,
                chunk * plan.chunk_hours,
            )?;

            let mut chunk_failed = false;
            match self.paginator.fetch_range(window, self.page_ceiling).await {
                Ok(fetch) => {
                    tracing::debug!(
                        data_type = %plan.data_type,
                        chunk = chunk + 1,
                        messages = fetch.messages.len(),
                        hit_page_limit = fetch.hit_page_limit,
                        "chunk fetched"
                    );
                    state.progress.messages_collected += fetch.messages.len() as u64;
                    messages.extend(fetch.messages);
                    state.progress.units_completed += 1;
                }
                Err(err) => {
                    tracing::error!(
                        data_type = %plan.data_type,
                        chunk = chunk + 1,
                        error = %err,
                        "chunk failed, continuing"
                    );
                    chunk_errors.push(format!("chunk {}: {err}", chunk + 1));
                    chunk_failed = true;
                }
            }

            state.progress.current_unit = (chunk + 2).min(chunks + 1);
            state.touch();
            self.job_states.upsert(state).await?;

            if chunk + 1 < chunks {
                let delay = if chunk_failed {
                    self.pacing.chunk_error_delay
                } else {
                    self.pacing.chunk_delay
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if messages.is_empty() {
            state.fail(
                format!("no messages found across {chunks} chunks"),
                (!chunk_errors.is_empty()).then(|| chunk_errors.join("; ")),
            );
            self.job_states.upsert(state).await?;
            return Err(PipelineError::NoDataFound(plan.data_type.to_string()));
        }

        let counts = aggregator::aggregate(&messages, &directory);
        let snapshot =
            MessageCountSnapshot::from_counts(plan.data_type, plan.total_hours, counts);
        self.snapshots.append(&snapshot).await?;

        state.status = JobStatus::Completed;
        if !chunk_errors.is_empty() {
            state.error = Some(crate::domain::JobError {
                message: format!("{} of {chunks} chunks failed", chunk_errors.len()),
                details: Some(chunk_errors.join("; ")),
            });
        }
        state.touch();
        self.job_states.upsert(state).await?;

        let report = IngestionReport {
            data_type: plan.data_type,
            total_messages: snapshot.total_messages,
            chain_pair_count: snapshot.message_counts.len(),
            failed_chunks: chunk_errors.len() as u32,
        };
        tracing::info!(
            data_type = %plan.data_type,
            total_messages = report.total_messages,
            chain_pairs = report.chain_pair_count,
            failed_chunks = report.failed_chunks,
            "ingestion run completed"
        );
        Ok(report)
    }
}
