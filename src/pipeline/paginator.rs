//! Time-window pagination with adaptive bisection.

use std::sync::Arc;

use crate::domain::{TeleporterMessage, TimeWindow};
use crate::error::PipelineError;
use crate::upstream::MessageApi;

/// Result of one [`TimeWindowPaginator::fetch_range`] invocation.
#[derive(Debug, Default)]
pub struct RangeFetch {
    /// Messages inside the window, plus any without a resolvable timestamp.
    /// No ordering guarantee.
    pub messages: Vec<TeleporterMessage>,
    /// Whether the page ceiling was ever hit while draining a window.
    pub hit_page_limit: bool,
    /// Whether a floor-sized window still hit the ceiling and partial data
    /// was accepted for it.
    pub reached_time_limit: bool,
}

/// Drives the upstream fetcher across a bounded time range.
///
/// Follows continuation tokens until the upstream is exhausted or the page
/// ceiling is reached. On a ceiling hit the window is bisected and each half
/// re-fetched — the strategy for volume spikes that flat pagination cannot
/// retrieve before tripping upstream limits. Windows at or below the
/// bisection floor accept partial data instead of recursing further, which
/// bounds the total work: the pending list never holds a window smaller
/// than half its parent, so depth is logarithmic in the span.
#[derive(Debug, Clone)]
pub struct TimeWindowPaginator {
    fetcher: Arc<dyn MessageApi>,
    min_bisect_span_secs: i64,
}

impl TimeWindowPaginator {
    /// Creates a paginator over the given fetcher.
    ///
    /// `min_bisect_span_secs` is the bisection floor (2 hours in
    /// production).
    #[must_use]
    pub fn new(fetcher: Arc<dyn MessageApi>, min_bisect_span_secs: i64) -> Self {
        Self {
            fetcher,
            min_bisect_span_secs,
        }
    }

    /// Fetches every message in `window`, bisecting on page-limit hits.
    ///
    /// Messages are filtered to the window by normalized timestamp;
    /// messages without any resolvable timestamp are always kept (explicit
    /// over-count policy — prefer over-counting to silent loss).
    ///
    /// # Errors
    ///
    /// Page-level errors from the fetcher propagate and abort the whole
    /// range; the caller decides whether a failed range is tolerable.
    pub async fn fetch_range(
        &self,
        window: TimeWindow,
        page_ceiling: u32,
    ) -> Result<RangeFetch, PipelineError> {
        let mut pending = vec![window];
        let mut result = RangeFetch::default();

        // Explicit work list instead of recursion: bounded stack depth
        // regardless of how deep the bisection goes.
        while let Some(current) = pending.pop() {
            let (page_messages, ceiling_hit) = self.drain_window(current, page_ceiling).await?;

            if ceiling_hit {
                result.hit_page_limit = true;
                if current.span_secs() > self.min_bisect_span_secs {
                    // Discard the partial flat fetch and re-fetch both
                    // halves; keeping it would double-count the overlap.
                    let (first, second) = current.bisect();
                    tracing::info!(
                        start = current.start(),
                        end = current.end(),
                        span_secs = current.span_secs(),
                        "page ceiling hit, bisecting window"
                    );
                    pending.push(first);
                    pending.push(second);
                    continue;
                }
                // At the floor: accept partial data rather than recurse.
                result.reached_time_limit = true;
                tracing::warn!(
                    start = current.start(),
                    end = current.end(),
                    "page ceiling hit at minimum window, accepting partial data"
                );
            }

            result
                .messages
                .extend(page_messages.into_iter().filter(|m| in_window(m, current)));
        }

        Ok(result)
    }

    /// Follows continuation tokens for one window up to the page ceiling.
    ///
    /// Returns the collected messages and whether the ceiling was reached
    /// while the upstream still had more pages.
    async fn drain_window(
        &self,
        window: TimeWindow,
        page_ceiling: u32,
    ) -> Result<(Vec<TeleporterMessage>, bool), PipelineError> {
        let mut messages = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self.fetcher.fetch_page(window, token.as_deref()).await?;
            messages.extend(page.messages);
            pages += 1;

            match page.next_page_token {
                None => return Ok((messages, false)),
                Some(_) if pages >= page_ceiling => return Ok((messages, true)),
                Some(next) => token = Some(next),
            }
        }
    }
}

/// Window membership check with the missing-timestamp inclusion policy.
fn in_window(message: &TeleporterMessage, window: TimeWindow) -> bool {
    message
        .resolved_timestamp()
        .is_none_or(|ts| window.contains(ts))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::upstream::MessagePage;

    fn msg(ts: Option<i64>) -> TeleporterMessage {
        TeleporterMessage {
            source_chain_id: "a".to_string(),
            destination_chain_id: "b".to_string(),
            source_timestamp: ts,
            destination_timestamp: None,
        }
    }

    /// Fake upstream that keeps returning a continuation token for windows
    /// wider than `token_above_span_secs`, and a final page otherwise.
    #[derive(Debug)]
    struct SpanApi {
        token_above_span_secs: i64,
        messages_per_page: Vec<TeleporterMessage>,
        calls: Mutex<Vec<(i64, Option<String>)>>,
    }

    impl SpanApi {
        fn new(token_above_span_secs: i64, messages_per_page: Vec<TeleporterMessage>) -> Arc<Self> {
            Arc::new(Self {
                token_above_span_secs,
                messages_per_page,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(i64, Option<String>)> {
            self.calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl MessageApi for SpanApi {
        async fn fetch_page(
            &self,
            window: TimeWindow,
            page_token: Option<&str>,
        ) -> Result<MessagePage, PipelineError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((window.span_secs(), page_token.map(str::to_string)));
            }
            let next = (window.span_secs() > self.token_above_span_secs)
                .then(|| "token".to_string());
            Ok(MessagePage {
                messages: self.messages_per_page.clone(),
                next_page_token: next,
            })
        }
    }

    fn day_window() -> TimeWindow {
        let Ok(window) = TimeWindow::new(0, 86_400) else {
            panic!("valid window");
        };
        window
    }

    #[tokio::test]
    async fn single_page_no_token_no_limit() {
        // Never issues a token: one page of 10 messages per window.
        let api = SpanApi::new(i64::MAX, vec![msg(Some(100)); 10]);
        let paginator = TimeWindowPaginator::new(Arc::clone(&api) as Arc<dyn MessageApi>, 7200);

        let Ok(fetch) = paginator.fetch_range(day_window(), 10).await else {
            panic!("fetch succeeds");
        };
        assert_eq!(fetch.messages.len(), 10);
        assert!(!fetch.hit_page_limit);
        assert!(!fetch.reached_time_limit);
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn ceiling_hit_bisects_into_halves() {
        // The 24h window paginates forever; each 12h half exhausts in one
        // page. Timestamp-less messages survive the window filter in both
        // halves.
        let api = SpanApi::new(43_200, vec![msg(None)]);
        let paginator = TimeWindowPaginator::new(Arc::clone(&api) as Arc<dyn MessageApi>, 7200);

        let Ok(fetch) = paginator.fetch_range(day_window(), 10).await else {
            panic!("fetch succeeds");
        };
        assert!(fetch.hit_page_limit);
        assert!(!fetch.reached_time_limit);

        let spans: Vec<i64> = api.calls().iter().map(|(span, _)| *span).collect();
        // 10 ceiling pages against the 24h window, then one page for each
        // half. The second half is one second shorter: the midpoint belongs
        // to the first.
        assert_eq!(spans.iter().filter(|s| **s == 86_400).count(), 10);
        assert_eq!(spans.iter().filter(|s| **s == 43_200).count(), 1);
        assert_eq!(spans.iter().filter(|s| **s == 43_199).count(), 1);
        // The partial 24h fetch is discarded; only the halves contribute.
        assert_eq!(fetch.messages.len(), 2);
    }

    #[tokio::test]
    async fn pathological_upstream_terminates_at_floor() {
        // Always issues a token: every window hits the ceiling. The 24h
        // window must bottom out at <=2h windows, not loop forever.
        let api = SpanApi::new(0, vec![msg(None)]);
        let paginator = TimeWindowPaginator::new(Arc::clone(&api) as Arc<dyn MessageApi>, 7200);

        let Ok(fetch) = paginator.fetch_range(day_window(), 2).await else {
            panic!("fetch succeeds");
        };
        assert!(fetch.hit_page_limit);
        assert!(fetch.reached_time_limit);

        // Window tree: 24h -> 2x12h -> 4x6h -> 8x3h -> 16x1.5h = 31
        // windows, 2 pages each.
        let calls = api.calls();
        assert_eq!(calls.len(), 31 * 2);
        // Only the 16 floor windows contribute messages (2 pages x 1 each).
        assert_eq!(fetch.messages.len(), 32);
    }

    #[tokio::test]
    async fn filters_by_normalized_timestamp_keeps_timestampless() {
        let Ok(window) = TimeWindow::new(1_699_990_000, 1_700_010_000) else {
            panic!("valid window");
        };
        let api = SpanApi::new(
            i64::MAX,
            vec![
                msg(Some(1_700_000_000)),     // in range, seconds
                msg(Some(1_700_000_000_500)), // in range once normalized from ms
                msg(Some(1_650_000_000)),     // out of range
                msg(None),                    // kept by policy
            ],
        );
        let paginator = TimeWindowPaginator::new(Arc::clone(&api) as Arc<dyn MessageApi>, 7200);

        let Ok(fetch) = paginator.fetch_range(window, 10).await else {
            panic!("fetch succeeds");
        };
        assert_eq!(fetch.messages.len(), 3);
    }
}
