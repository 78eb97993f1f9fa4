//! Validated absolute time window for upstream fetches.

use chrono::{DateTime, Utc};

use crate::error::PipelineError;

/// An inclusive `[start, end]` window in unix seconds with `start <= end`.
///
/// All fetch paths operate on absolute windows; conversion from the
/// "hours ago" form used by job plans happens at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    /// Creates a window from absolute unix-second bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTimeRange`] if `start > end`.
    pub const fn new(start: i64, end: i64) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window covering `[now - start_hours_ago, now - end_hours_ago]`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTimeRange`] if `start_hours_ago` is
    /// smaller than `end_hours_ago`.
    pub fn hours_ago(now: DateTime<Utc>, start_hours_ago: u32, end_hours_ago: u32) -> Result<Self, PipelineError> {
        let now_secs = now.timestamp();
        Self::new(
            now_secs - i64::from(start_hours_ago) * 3600,
            now_secs - i64::from(end_hours_ago) * 3600,
        )
    }

    /// Unix-second start of the window.
    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Unix-second end of the window.
    #[must_use]
    pub const fn end(&self) -> i64 {
        self.end
    }

    /// Window span in seconds.
    #[must_use]
    pub const fn span_secs(&self) -> i64 {
        self.end - self.start
    }

    /// Whether the normalized timestamp falls inside the window.
    #[must_use]
    pub const fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }

    /// Splits the window at its midpoint into two disjoint halves.
    ///
    /// The midpoint second belongs to the first half only, so a message
    /// timestamped exactly on the boundary is counted once.
    #[must_use]
    pub const fn bisect(&self) -> (Self, Self) {
        let mid = self.start + self.span_secs() / 2;
        (
            Self {
                start: self.start,
                end: mid,
            },
            Self {
                start: mid + 1,
                end: self.end,
            },
        )
    }
}
