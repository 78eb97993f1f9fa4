//! Ingestion pipeline: pagination, chunked jobs, checkpointing, aggregation.
//!
//! The pipeline is layered bottom-up: [`paginator::TimeWindowPaginator`]
//! drives the upstream fetcher across one bounded window, bisecting it when
//! upstream page limits bite; [`engine::IngestionEngine`] runs a whole span
//! chunk by chunk; [`checkpoint::CheckpointedWeeklyJob`] advances the weekly
//! job one day at a time against its persisted checkpoint record.

pub mod aggregator;
pub mod checkpoint;
pub mod engine;
pub mod paginator;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use chrono::{Duration, Utc};

pub use checkpoint::{CheckpointedWeeklyJob, WeeklyOutcome};
pub use engine::{IngestionEngine, IngestionPlan, IngestionReport, PacingConfig};
pub use paginator::{RangeFetch, TimeWindowPaginator};

use crate::domain::JobState;
use crate::error::PipelineError;
use crate::persistence::JobStateStore;

/// Flips a stale `InProgress` record to `Failed` and persists it.
///
/// Idempotent by construction: staleness only holds for `InProgress`
/// records, so once one observer has flipped the record, every later
/// observer sees `Failed` and leaves it alone — no double error append.
/// Returns whether a transition happened.
///
/// # Errors
///
/// Returns [`PipelineError::Persistence`] if the corrected record cannot
/// be written.
pub async fn reconcile_stale(
    job_states: &Arc<dyn JobStateStore>,
    state: &mut JobState,
    threshold: Duration,
) -> Result<bool, PipelineError> {
    if !state.is_stale(threshold) {
        return Ok(false);
    }
    let idle_secs = (Utc::now() - state.last_updated_at).num_seconds();
    tracing::warn!(
        data_type = %state.data_type,
        idle_secs,
        "reconciling stale job state"
    );
    let stale = PipelineError::StaleJobState {
        data_type: state.data_type.to_string(),
        idle_secs,
    };
    state.fail(stale.to_string(), None);
    job_states.upsert(state).await?;
    Ok(true)
}
