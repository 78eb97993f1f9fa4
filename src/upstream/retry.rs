//! Retry, backoff, and pacing policy around a raw [`MessageApi`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::client::{MessageApi, MessagePage};
use crate::domain::TimeWindow;
use crate::error::PipelineError;

/// Retry and pacing tunables.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per page, including the first.
    pub max_attempts: u32,
    /// Backoff after the first retryable failure; doubles per attempt.
    pub initial_backoff: Duration,
    /// Fixed delay between successive page fetches of one window, to stay
    /// under the upstream rate limit. Not applied after a terminal page.
    pub page_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(5),
            page_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy with zero delays, for tests.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            page_delay: Duration::ZERO,
        }
    }
}

/// [`MessageApi`] wrapper that retries rate-limit and network-class errors
/// with exponential backoff and paces successful page fetches.
///
/// Non-retryable errors ([`PipelineError::UpstreamBadResponse`] and
/// friends) propagate immediately; exhausting the attempt ceiling yields
/// [`PipelineError::UpstreamUnavailable`].
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    inner: Arc<dyn MessageApi>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    /// Wraps a raw client with the given policy.
    #[must_use]
    pub fn new(inner: Arc<dyn MessageApi>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl MessageApi for RetryingFetcher {
    async fn fetch_page(
        &self,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> Result<MessagePage, PipelineError> {
        let mut backoff = self.policy.initial_backoff;
        let mut last_error = String::new();

        for attempt in 1..=self.policy.max_attempts {
            match self.inner.fetch_page(window, page_token).await {
                Ok(page) => {
                    // Pace only when a follow-up fetch is coming.
                    if page.next_page_token.is_some() && !self.policy.page_delay.is_zero() {
                        tokio::time::sleep(self.policy.page_delay).await;
                    }
                    return Ok(page);
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        backoff_secs = backoff.as_secs(),
                        error = %err,
                        "retryable upstream error"
                    );
                    last_error = err.to_string();
                    if attempt < self.policy.max_attempts {
                        if !backoff.is_zero() {
                            tokio::time::sleep(backoff).await;
                        }
                        backoff = backoff.saturating_mul(2);
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(PipelineError::UpstreamUnavailable {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Raw client fake returning a scripted sequence of results.
    #[derive(Debug, Default)]
    struct SequenceApi {
        responses: Mutex<VecDeque<Result<MessagePage, PipelineError>>>,
        calls: Mutex<u32>,
    }

    impl SequenceApi {
        fn scripted(responses: Vec<Result<MessagePage, PipelineError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.lock().map(|c| *c).unwrap_or(0)
        }
    }

    #[async_trait]
    impl MessageApi for SequenceApi {
        async fn fetch_page(
            &self,
            _window: TimeWindow,
            _page_token: Option<&str>,
        ) -> Result<MessagePage, PipelineError> {
            if let Ok(mut calls) = self.calls.lock() {
                *calls += 1;
            }
            let Ok(mut responses) = self.responses.lock() else {
                panic!("responses lock poisoned");
            };
            responses.pop_front().unwrap_or_else(|| Ok(MessagePage::default()))
        }
    }

    fn window() -> TimeWindow {
        let Ok(w) = TimeWindow::new(0, 3600) else {
            panic!("valid window");
        };
        w
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let api = SequenceApi::scripted(vec![
            Err(PipelineError::UpstreamRateLimited),
            Err(PipelineError::NetworkUnavailable("timeout".to_string())),
            Ok(MessagePage::default()),
        ]);
        let fetcher = RetryingFetcher::new(Arc::clone(&api) as Arc<dyn MessageApi>, RetryPolicy::immediate(5));

        let result = fetcher.fetch_page(window(), None).await;
        assert!(result.is_ok());
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_propagates_immediately() {
        let api = SequenceApi::scripted(vec![Err(PipelineError::UpstreamBadResponse(
            "404 Not Found".to_string(),
        ))]);
        let fetcher = RetryingFetcher::new(Arc::clone(&api) as Arc<dyn MessageApi>, RetryPolicy::immediate(5));

        let result = fetcher.fetch_page(window(), None).await;
        assert!(matches!(result, Err(PipelineError::UpstreamBadResponse(_))));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_applies_only_between_pages() {
        let api = SequenceApi::scripted(vec![
            Ok(MessagePage {
                messages: Vec::new(),
                next_page_token: Some("more".to_string()),
            }),
            Ok(MessagePage::default()),
        ]);
        let policy = RetryPolicy {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            page_delay: Duration::from_secs(2),
        };
        let fetcher = RetryingFetcher::new(Arc::clone(&api) as Arc<dyn MessageApi>, policy);

        // A page with a continuation token incurs the pacing delay.
        let before = tokio::time::Instant::now();
        let result = fetcher.fetch_page(window(), None).await;
        assert!(result.is_ok());
        assert_eq!(before.elapsed(), Duration::from_secs(2));

        // The terminal page does not.
        let before = tokio::time::Instant::now();
        let result = fetcher.fetch_page(window(), Some("more")).await;
        assert!(result.is_ok());
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn exhausted_retries_report_attempts() {
        let api = SequenceApi::scripted(vec![
            Err(PipelineError::UpstreamRateLimited),
            Err(PipelineError::UpstreamRateLimited),
            Err(PipelineError::UpstreamRateLimited),
        ]);
        let fetcher = RetryingFetcher::new(Arc::clone(&api) as Arc<dyn MessageApi>, RetryPolicy::immediate(3));

        let result = fetcher.fetch_page(window(), None).await;
        match result {
            Err(PipelineError::UpstreamUnavailable { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected UpstreamUnavailable, got {other:?}"),
        }
        assert_eq!(api.call_count(), 3);
    }
}
