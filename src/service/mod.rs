//! Service layer: the public job entry points and snapshot reads.
//!
//! [`IngestionService`] is what HTTP handlers, the scheduler, and scripts
//! call; it owns the pipeline components and the stores.

pub mod ingestion_service;

pub use ingestion_service::IngestionService;
