//! Bounded fan-out over a ticker list with a per-provider semaphore,
//! per-call timeout, and a global wall-clock budget that returns whatever
//! finished rather than failing the whole batch.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Per-provider concurrency bound plus timeouts. Typical concurrency is 1 for a
/// strict vendor, higher where the vendor permits; each `Provider*`
/// implementation owns one harness.
pub struct ConcurrencyHarness {
    semaphore: Arc<Semaphore>,
    per_call_timeout: Duration,
}

impl ConcurrencyHarness {
    pub fn new(max_concurrency: usize, per_call_timeout: Duration) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))), per_call_timeout }
    }

    /// Fetch `f(ticker)` for every ticker with bounded concurrency. A call that
    /// doesn't finish within `per_call_timeout`, or that panics, is absent from the
    /// returned map rather than failing the batch — every provider port returns
    /// `None` on any failure, never an error. `global_budget` bounds the whole
    /// fan-out: once it elapses, outstanding calls are abandoned and whatever
    /// already completed is returned.
    pub async fn fetch_all<T, F, Fut>(
        &self,
        tickers: &[String],
        global_budget: Duration,
        f: F,
    ) -> HashMap<String, T>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let mut set = JoinSet::new();
        for ticker in tickers {
            let ticker = ticker.clone();
            let permit_source = self.semaphore.clone();
            let call_timeout = self.per_call_timeout;
            let f = f.clone();
            set.spawn(async move {
                let _permit = permit_source.acquire_owned().await.ok()?;
                match tokio::time::timeout(call_timeout, f(ticker.clone())).await {
                    Ok(Some(value)) => Some((ticker, value)),
                    _ => None,
                }
            });
        }

        let mut results = HashMap::new();
        let deadline = tokio::time::Instant::now() + global_budget;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                tracing::warn!(outstanding = set.len(), "concurrency harness global budget exhausted");
                set.abort_all();
                break;
            }
            tokio::select! {
                joined = set.join_next() => {
                    match joined {
                        Some(Ok(Some((ticker, value)))) => { results.insert(ticker, value); }
                        Some(_) => {}
                        None => break,
                    }
                }
                _ = tokio::time::sleep(remaining) => {
                    tracing::warn!(outstanding = set.len(), "concurrency harness global budget exhausted");
                    set.abort_all();
                    break;
                }
            }
        }
        results
    }
}

/// Retries a fallible call up to `max_attempts` times only when the failure is a
/// rate limit (HTTP 429); any other failure is treated as absent immediately.
/// `is_rate_limited` inspects the error to decide whether to retry.
pub async fn with_retry_on_rate_limit<T, E, F, Fut>(
    max_attempts: usize,
    backoff: Duration,
    is_rate_limited: impl Fn(&E) -> bool,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < max_attempts && is_rate_limited(&err) => {
                attempt += 1;
                tokio::time::sleep(backoff * attempt as u32).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn fetch_all_collects_every_successful_ticker() {
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(1));
        let tickers = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let results = harness
            .fetch_all(&tickers, Duration::from_secs(2), |ticker| async move { Some(ticker.len()) })
            .await;
        assert_eq!(results.len(), 3);
        assert_eq!(results["AAA"], 3);
    }

    #[tokio::test]
    async fn fetch_all_drops_tickers_whose_call_returns_none() {
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(1));
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        let results = harness
            .fetch_all(&tickers, Duration::from_secs(2), |ticker| async move {
                if ticker == "AAA" { Some(1) } else { None }
            })
            .await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("AAA"));
    }

    #[tokio::test]
    async fn fetch_all_returns_partial_results_when_budget_exhausted() {
        let harness = ConcurrencyHarness::new(4, Duration::from_secs(5));
        let tickers = vec!["SLOW".to_string(), "FAST".to_string()];
        let results = harness
            .fetch_all(&tickers, Duration::from_millis(120), |ticker| async move {
                if ticker == "SLOW" {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Some(ticker)
            })
            .await;
        assert!(results.contains_key("FAST"));
        assert!(!results.contains_key("SLOW"));
    }

    #[tokio::test]
    async fn with_retry_on_rate_limit_retries_only_429s() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result: Result<i32, &str> = with_retry_on_rate_limit(
            3,
            Duration::from_millis(1),
            |e: &&str| *e == "429",
            move || {
                let calls2 = calls2.clone();
                async move {
                    let n = calls2.fetch_add(1, Ordering::SeqCst);
                    if n < 2 { Err("429") } else { Ok(7) }
                }
            },
        )
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn with_retry_on_rate_limit_does_not_retry_other_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let result: Result<i32, &str> = with_retry_on_rate_limit(
            3,
            Duration::from_millis(1),
            |e: &&str| *e == "429",
            move || {
                let calls2 = calls2.clone();
                async move {
                    calls2.fetch_add(1, Ordering::SeqCst);
                    Err("500")
                }
            },
        )
        .await;
        assert_eq!(result, Err("500"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
