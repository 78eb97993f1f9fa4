//! DTOs for snapshot read endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{ChainPairCount, MessageCountSnapshot};

/// Query parameters for the latest-snapshot endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestParams {
    /// Data type to read: `daily` or `weekly`.
    pub data_type: String,
}

/// Query parameters for the snapshot-history endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Data type to read: `daily` or `weekly`.
    pub data_type: String,
    /// Number of snapshots to return (max 100). Defaults to 20.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

impl HistoryParams {
    /// Clamps `limit` to the allowed range of 1..=100.
    #[must_use]
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, 100)
    }
}

/// One snapshot as served to clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnapshotDto {
    /// Data type the snapshot belongs to.
    pub data_type: String,
    /// Ingestion window size in hours.
    pub time_window_hours: u32,
    /// Total messages across all chain pairs.
    pub total_messages: u64,
    /// Per-pair counts, descending by count.
    pub message_counts: Vec<ChainPairCount>,
    /// When the snapshot was produced.
    pub updated_at: DateTime<Utc>,
}

impl From<MessageCountSnapshot> for SnapshotDto {
    fn from(snapshot: MessageCountSnapshot) -> Self {
        Self {
            data_type: snapshot.data_type.to_string(),
            time_window_hours: snapshot.time_window_hours,
            total_messages: snapshot.total_messages,
            message_counts: snapshot.message_counts,
            updated_at: snapshot.updated_at,
        }
    }
}
