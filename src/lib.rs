//! # teleporter-metrics
//!
//! Aggregation backend for a cross-chain teleporter message dashboard.
//!
//! The service periodically pulls message events from an upstream REST API
//! over sliding time windows, reduces them into per-chain-pair counts, stores
//! the results as snapshots in PostgreSQL, and serves them through a small
//! set of read endpoints. Ingestion jobs checkpoint their progress after
//! every unit of work so a crash or redeploy resumes instead of restarting.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)                        Upstream message API
//!     │                                     ▲
//!     ├── REST Handlers (api/)              │
//!     │                                     │
//!     ├── IngestionService (service/)       │
//!     │       │                             │
//!     │       ├── IngestionEngine ──► TimeWindowPaginator ──► RetryingFetcher
//!     │       └── CheckpointedWeeklyJob     (pipeline/)        (upstream/)
//!     │
//!     └── PostgreSQL (persistence/): snapshots, job states, chain directory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod pipeline;
pub mod service;
pub mod upstream;
