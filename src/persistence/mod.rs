//! Persistence layer: snapshot history, job checkpoints, chain directory.
//!
//! The pipeline depends on the trait objects defined here; the concrete
//! implementation uses `sqlx::PgPool` with JSONB document columns. Shared
//! as `Arc<dyn …>` so tests can substitute in-memory stores.

pub mod postgres;

use async_trait::async_trait;

pub use postgres::PostgresStores;

use crate::domain::{ChainDirectory, DataType, JobState, MessageCountSnapshot};
use crate::error::PipelineError;

/// Append-only store of ingestion result snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Appends a finished snapshot to the history.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn append(&self, snapshot: &MessageCountSnapshot) -> Result<(), PipelineError>;

    /// Returns the most recent snapshot for the data type, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn latest(&self, data_type: DataType)
    -> Result<Option<MessageCountSnapshot>, PipelineError>;

    /// Returns up to `limit` snapshots for the data type, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn history(
        &self,
        data_type: DataType,
        limit: u32,
    ) -> Result<Vec<MessageCountSnapshot>, PipelineError>;
}

/// Keyed store of the one live [`JobState`] record per data type.
///
/// Upsert-by-key semantics: the whole record is written as a document, and
/// concurrent writers resolve last-writer-wins.
#[async_trait]
pub trait JobStateStore: Send + Sync + std::fmt::Debug {
    /// Loads the current record for the data type, if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn load(&self, data_type: DataType) -> Result<Option<JobState>, PipelineError>;

    /// Writes the record, replacing any existing one for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn upsert(&self, state: &JobState) -> Result<(), PipelineError>;
}

/// Read-only access to the chain directory maintained by another subsystem.
#[async_trait]
pub trait ChainDirectoryStore: Send + Sync + std::fmt::Debug {
    /// Loads the current id → name mapping.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persistence`] on storage failure.
    async fn load_directory(&self) -> Result<ChainDirectory, PipelineError>;
}
