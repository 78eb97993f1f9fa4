//! Upstream message API access.
//!
//! [`MessageApi`] is the seam between the pipeline and the network:
//! [`client::HttpMessageApiClient`] performs exactly one HTTP request per
//! call, and [`retry::RetryingFetcher`] wraps any `MessageApi` with the
//! retry/backoff and pacing policy.

pub mod client;
pub mod retry;

pub use client::{HttpMessageApiClient, MessageApi, MessagePage, UpstreamConfig};
pub use retry::{RetryPolicy, RetryingFetcher};
