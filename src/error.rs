//! Pipeline error types with HTTP status code mapping.
//!
//! [`PipelineError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "upstream rate limit exceeded",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`PipelineError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
/// | 4000–4999 | Upstream        | 502 Bad Gateway / 429        |
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A time range with start after end was supplied.
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange {
        /// Unix-second start of the rejected range.
        start: i64,
        /// Unix-second end of the rejected range.
        end: i64,
    },

    /// No snapshot has ever been persisted for the requested data type.
    #[error("no snapshot available for data type: {0}")]
    NoSnapshot(String),

    /// A fresh job for the same data type is already in progress.
    #[error("a {0} ingestion job is already in progress")]
    JobAlreadyRunning(String),

    /// A job state record stopped receiving heartbeats.
    #[error("stale job state for {data_type}: no update for {idle_secs}s")]
    StaleJobState {
        /// Data type of the stale record.
        data_type: String,
        /// Seconds since the record was last touched.
        idle_secs: i64,
    },

    /// Upstream returned HTTP 429. Retried by the fetcher.
    #[error("upstream rate limit exceeded")]
    UpstreamRateLimited,

    /// Network-class failure reaching the upstream (timeout, DNS,
    /// connection refused, 5xx). Retried by the fetcher.
    #[error("upstream network error: {0}")]
    NetworkUnavailable(String),

    /// The retry ceiling was exhausted without a successful page.
    #[error("upstream unavailable after {attempts} attempts: {last_error}")]
    UpstreamUnavailable {
        /// Number of attempts made.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },

    /// Upstream broke its contract: a non-429 4xx status or a malformed
    /// response body. Never retried.
    #[error("bad upstream response: {0}")]
    UpstreamBadResponse(String),

    /// An ingestion run collected zero messages across every chunk.
    /// Terminal for the job, not a panic for the caller.
    #[error("no messages found for {0} ingestion")]
    NoDataFound(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidTimeRange { .. } => 1002,
            Self::NoSnapshot(_) => 2001,
            Self::JobAlreadyRunning(_) => 2002,
            Self::StaleJobState { .. } => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::UpstreamRateLimited => 4001,
            Self::NetworkUnavailable(_) => 4002,
            Self::UpstreamUnavailable { .. } => 4003,
            Self::UpstreamBadResponse(_) => 4004,
            Self::NoDataFound(_) => 4005,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidTimeRange { .. } => StatusCode::BAD_REQUEST,
            Self::NoSnapshot(_) => StatusCode::NOT_FOUND,
            Self::JobAlreadyRunning(_) | Self::StaleJobState { .. } => StatusCode::CONFLICT,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamRateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NetworkUnavailable(_)
            | Self::UpstreamUnavailable { .. }
            | Self::UpstreamBadResponse(_)
            | Self::NoDataFound(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whether the retrying fetcher should retry after this error.
    ///
    /// Only rate limiting and network-class failures qualify; a broken
    /// upstream contract propagates immediately.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamRateLimited | Self::NetworkUnavailable(_))
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn error_response_is_schema_documented() {
        // Handlers reference these as response bodies in OpenAPI paths.
        assert_eq!(<ErrorResponse as ToSchema>::name(), "ErrorResponse");
        assert_eq!(<ErrorBody as ToSchema>::name(), "ErrorBody");
    }

    #[test]
    fn retryable_classification() {
        assert!(PipelineError::UpstreamRateLimited.is_retryable());
        assert!(PipelineError::NetworkUnavailable("timeout".to_string()).is_retryable());
        assert!(!PipelineError::UpstreamBadResponse("404".to_string()).is_retryable());
        assert!(
            !PipelineError::UpstreamUnavailable {
                attempts: 5,
                last_error: "timeout".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            PipelineError::NoSnapshot("daily".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PipelineError::UpstreamRateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            PipelineError::NoDataFound("weekly".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
