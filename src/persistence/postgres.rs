//! PostgreSQL implementation of the persistence traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{ChainDirectoryStore, JobStateStore, SnapshotStore};
use crate::domain::{ChainDirectory, ChainPairCount, DataType, JobState, MessageCountSnapshot};
use crate::error::PipelineError;

/// PostgreSQL-backed stores using one shared `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStores {
    pool: PgPool,
}

impl PostgresStores {
    /// Creates the stores with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PostgresStores {
    async fn append(&self, snapshot: &MessageCountSnapshot) -> Result<(), PipelineError> {
        let counts = serde_json::to_value(&snapshot.message_counts)
            .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO snapshots (data_type, time_window_hours, total_messages, message_counts, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(snapshot.data_type.as_str())
        .bind(i32::try_from(snapshot.time_window_hours).unwrap_or(i32::MAX))
        .bind(i64::try_from(snapshot.total_messages).unwrap_or(i64::MAX))
        .bind(counts)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn latest(
        &self,
        data_type: DataType,
    ) -> Result<Option<MessageCountSnapshot>, PipelineError> {
        let row = sqlx::query_as::<_, (i32, i64, serde_json::Value, DateTime<Utc>)>(
            "SELECT time_window_hours, total_messages, message_counts, updated_at \
             FROM snapshots WHERE data_type = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(data_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        row.map(|r| snapshot_from_row(data_type, r)).transpose()
    }

    async fn history(
        &self,
        data_type: DataType,
        limit: u32,
    ) -> Result<Vec<MessageCountSnapshot>, PipelineError> {
        let rows = sqlx::query_as::<_, (i32, i64, serde_json::Value, DateTime<Utc>)>(
            "SELECT time_window_hours, total_messages, message_counts, updated_at \
             FROM snapshots WHERE data_type = $1 ORDER BY updated_at DESC LIMIT $2",
        )
        .bind(data_type.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        rows.into_iter()
            .map(|r| snapshot_from_row(data_type, r))
            .collect()
    }
}

/// Maps a snapshot row tuple back into the domain type.
fn snapshot_from_row(
    data_type: DataType,
    (time_window_hours, total_messages, message_counts, updated_at): (
        i32,
        i64,
        serde_json::Value,
        DateTime<Utc>,
    ),
) -> Result<MessageCountSnapshot, PipelineError> {
    let message_counts: Vec<ChainPairCount> = serde_json::from_value(message_counts)
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

    Ok(MessageCountSnapshot {
        data_type,
        time_window_hours: u32::try_from(time_window_hours).unwrap_or(0),
        total_messages: u64::try_from(total_messages).unwrap_or(0),
        message_counts,
        updated_at,
    })
}

#[async_trait]
impl JobStateStore for PostgresStores {
    async fn load(&self, data_type: DataType) -> Result<Option<JobState>, PipelineError> {
        let row = sqlx::query_as::<_, (serde_json::Value,)>(
            "SELECT document FROM job_states WHERE data_type = $1",
        )
        .bind(data_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        row.map(|(document,)| {
            serde_json::from_value(document).map_err(|e| PipelineError::Persistence(e.to_string()))
        })
        .transpose()
    }

    async fn upsert(&self, state: &JobState) -> Result<(), PipelineError> {
        let document =
            serde_json::to_value(state).map_err(|e| PipelineError::Persistence(e.to_string()))?;

        // Promoted columns exist for ad-hoc SQL inspection; the document is
        // the source of truth.
        sqlx::query(
            "INSERT INTO job_states (data_type, status, last_updated_at, document) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (data_type) DO UPDATE SET \
                 status = EXCLUDED.status, \
                 last_updated_at = EXCLUDED.last_updated_at, \
                 document = EXCLUDED.document",
        )
        .bind(state.data_type.as_str())
        .bind(status_str(state))
        .bind(state.last_updated_at)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// Lowercase status string for the promoted column.
const fn status_str(state: &JobState) -> &'static str {
    match state.status {
        crate::domain::JobStatus::InProgress => "in_progress",
        crate::domain::JobStatus::Completed => "completed",
        crate::domain::JobStatus::Failed => "failed",
    }
}

#[async_trait]
impl ChainDirectoryStore for PostgresStores {
    async fn load_directory(&self) -> Result<ChainDirectory, PipelineError> {
        let rows =
            sqlx::query_as::<_, (String, String)>("SELECT chain_id, chain_name FROM chains")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PipelineError::Persistence(e.to_string()))?;

        Ok(ChainDirectory::from_pairs(rows))
    }
}
