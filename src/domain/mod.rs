//! Domain layer: core types of the ingestion pipeline.
//!
//! This module contains the ephemeral message model, the persisted snapshot
//! and job-state records, the chain name directory, and the validated time
//! window used throughout the fetch path.

pub mod chain_directory;
pub mod job_state;
pub mod message;
pub mod snapshot;
pub mod time_window;

pub use chain_directory::ChainDirectory;
pub use job_state::{DayResult, JobError, JobProgress, JobState, JobStatus};
pub use message::TeleporterMessage;
pub use snapshot::{ChainPairCount, DataType, MessageCountSnapshot};
pub use time_window::TimeWindow;
