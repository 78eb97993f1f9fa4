//! Request and response DTOs for the REST endpoints.

pub mod job_dto;
pub mod snapshot_dto;

pub use job_dto::{JobStateDto, JobStateResponse, JobTriggerResponse};
pub use snapshot_dto::{HistoryParams, LatestParams, SnapshotDto};
