//! Ephemeral cross-chain message model.
//!
//! Messages are fetched, counted, and discarded — they are never persisted
//! individually. Only the aggregated per-chain-pair counts survive a run.

use serde::{Deserialize, Serialize};

/// Timestamps above this value are milliseconds and get normalized to
/// seconds. Unix seconds will not cross 10^12 for roughly 30,000 years.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// One cross-chain message event as reported by the upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeleporterMessage {
    /// Identifier of the chain the message originated on.
    pub source_chain_id: String,
    /// Identifier of the chain the message was delivered to.
    pub destination_chain_id: String,
    /// Source-transaction timestamp, seconds or milliseconds.
    pub source_timestamp: Option<i64>,
    /// Destination-transaction timestamp, seconds or milliseconds.
    pub destination_timestamp: Option<i64>,
}

impl TeleporterMessage {
    /// Resolves the message timestamp in normalized unix seconds.
    ///
    /// Precedence is fixed: the source-transaction timestamp wins, the
    /// destination-transaction timestamp is the fallback. Values above 10^12
    /// are treated as milliseconds and divided by 1000. Returns `None` when
    /// neither field is present — such messages are counted as in-range by
    /// policy, never dropped.
    #[must_use]
    pub fn resolved_timestamp(&self) -> Option<i64> {
        self.source_timestamp
            .or(self.destination_timestamp)
            .map(normalize_timestamp)
    }
}

/// Converts a possibly-millisecond timestamp to unix seconds.
const fn normalize_timestamp(value: i64) -> i64 {
    if value > MILLIS_THRESHOLD {
        value / 1000
    } else {
        value
    }
}
