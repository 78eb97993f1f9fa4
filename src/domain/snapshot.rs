//! Persisted aggregation output: the message count snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::PipelineError;

/// Which ingestion variant produced a snapshot or owns a job state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 24-hour ingestion window.
    Daily,
    /// 168-hour ingestion window.
    Weekly,
}

impl DataType {
    /// Canonical lowercase name, used as the persistence key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }

    /// The ingestion window in hours this data type covers.
    #[must_use]
    pub const fn window_hours(&self) -> u32 {
        match self {
            Self::Daily => 24,
            Self::Weekly => 168,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            other => Err(PipelineError::InvalidRequest(format!(
                "unknown data type: {other}"
            ))),
        }
    }
}

/// Message count for one (source, destination) chain pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChainPairCount {
    /// Resolved display name of the source chain.
    pub source_chain_name: String,
    /// Resolved display name of the destination chain.
    pub destination_chain_name: String,
    /// Number of messages observed for this pair.
    pub message_count: u64,
}

/// One complete, persisted result of an ingestion run.
///
/// Snapshots accumulate as an append-only history; non-historical reads
/// return the most recent snapshot per [`DataType`]. Invariant: the sum of
/// `message_counts[].message_count` equals `total_messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCountSnapshot {
    /// Which ingestion variant produced this snapshot.
    pub data_type: DataType,
    /// Size of the ingestion window in hours (24 or 168).
    pub time_window_hours: u32,
    /// Total messages across all chain pairs.
    pub total_messages: u64,
    /// Per-pair counts, sorted strictly descending by count.
    pub message_counts: Vec<ChainPairCount>,
    /// When the snapshot was produced.
    pub updated_at: DateTime<Utc>,
}

impl MessageCountSnapshot {
    /// Builds a snapshot from aggregated pair counts, deriving the total.
    #[must_use]
    pub fn from_counts(
        data_type: DataType,
        time_window_hours: u32,
        message_counts: Vec<ChainPairCount>,
    ) -> Self {
        let total_messages = message_counts.iter().map(|c| c.message_count).sum();
        Self {
            data_type,
            time_window_hours,
            total_messages,
            message_counts,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn data_type_round_trips_through_str() {
        let Ok(parsed) = "weekly".parse::<DataType>() else {
            panic!("weekly parses");
        };
        assert_eq!(parsed, DataType::Weekly);
        assert!("hourly".parse::<DataType>().is_err());
    }

    #[test]
    fn from_counts_derives_total() {
        let counts = vec![
            ChainPairCount {
                source_chain_name: "C-Chain".to_string(),
                destination_chain_name: "Dexalot".to_string(),
                message_count: 7,
            },
            ChainPairCount {
                source_chain_name: "Dexalot".to_string(),
                destination_chain_name: "C-Chain".to_string(),
                message_count: 3,
            },
        ];
        let snapshot = MessageCountSnapshot::from_counts(DataType::Daily, 24, counts);
        assert_eq!(snapshot.total_messages, 10);
    }
}
