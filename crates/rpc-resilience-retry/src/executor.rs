use crate::config::RetryConfig;
use crate::events::RetryEvent;
use rpc_resilience_core::EventListeners;
use std::future::Future;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

/// Runs a supplied operation through the bounded retry loop described in
/// §4.5: up to `max_retries + 1` attempts, sleeping the configured backoff
/// between failures the classifier marks retryable.
pub struct RetryExecutor<E> {
    config: RetryConfig<E>,
    listeners: EventListeners<RetryEvent>,
}

impl<E> RetryExecutor<E> {
    /// Builds an executor from `config`, carrying over any listeners
    /// registered on its builder (e.g. via `on_retry`).
    pub fn new(mut config: RetryConfig<E>) -> Self {
        let listeners = std::mem::take(&mut config.event_listeners);
        Self { config, listeners }
    }

    pub fn listeners(&self) -> &EventListeners<RetryEvent> {
        &self.listeners
    }

    /// Executes `op`, retrying on classified-retryable failures.
    ///
    /// `op` is called with the 0-indexed attempt number. Returns the last
    /// captured error once attempts are exhausted or the classifier
    /// declares an error non-retryable.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut last_err = None;

        for attempt in 0..max_attempts {
            match op(attempt as usize).await {
                Ok(value) => {
                    self.listeners.emit(&RetryEvent::Success {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempts: attempt as usize + 1,
                    });
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = self
                        .config
                        .predicate
                        .as_ref()
                        .map(|p| p(&err))
                        .unwrap_or(true);

                    if !retryable {
                        self.listeners.emit(&RetryEvent::NonRetryable {
                            name: self.config.name.clone(),
                            timestamp: Instant::now(),
                        });
                        return Err(err);
                    }

                    let is_last = attempt + 1 >= max_attempts;
                    if is_last {
                        last_err = Some(err);
                        break;
                    }

                    let delay = self.config.interval_fn.next_interval(attempt as usize);
                    self.listeners.emit(&RetryEvent::Retry {
                        name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        attempt: attempt as usize + 1,
                        delay,
                    });

                    #[cfg(feature = "metrics")]
                    counter!("retry_attempts_total", "name" => self.config.name.clone())
                        .increment(1);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(name = %self.config.name, attempt, ?delay, "retrying");

                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                }
            }
        }

        self.listeners.emit(&RetryEvent::Exhausted {
            name: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts: max_attempts as usize,
        });

        Err(last_err.expect("at least one attempt always runs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry_on_first_attempt() {
        let executor: RetryExecutor<String> = RetryExecutor::new(RetryConfig::builder().build());
        let result = executor.execute(|_| async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_up_to_max_attempts_then_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let executor: RetryExecutor<String> = RetryExecutor::new(
            RetryConfig::builder()
                .max_retries(2)
                .backoff(crate::backoff::FixedInterval::new(Duration::from_millis(1)))
                .build(),
        );
        let result = executor
            .execute(|_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("boom".to_string())
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3); // 1 + maxRetries
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_later_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let executor: RetryExecutor<String> = RetryExecutor::new(
            RetryConfig::builder()
                .max_retries(5)
                .backoff(crate::backoff::FixedInterval::new(Duration::from_millis(1)))
                .build(),
        );
        let result = executor
            .execute(|attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err("boom".to_string())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let executor: RetryExecutor<String> = RetryExecutor::new(
            RetryConfig::builder()
                .max_retries(5)
                .retry_on(|e: &String| e != "UNAUTHORIZED")
                .build(),
        );
        let result = executor
            .execute(|_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("UNAUTHORIZED".to_string())
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
