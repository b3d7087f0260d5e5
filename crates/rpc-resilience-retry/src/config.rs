//! Configuration for the retry engine.

use crate::backoff::{ExponentialBackoff, IntervalFunction};
use crate::events::RetryEvent;
use crate::policy::RetryPredicate;
use rpc_resilience_core::EventListeners;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`crate::RetryExecutor`].
pub struct RetryConfig<E> {
    /// Total attempts = `max_retries + 1`.
    pub(crate) max_retries: u32,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) predicate: Option<RetryPredicate<E>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl<E> RetryConfig<E> {
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

pub struct RetryConfigBuilder<E> {
    max_retries: u32,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    predicate: Option<RetryPredicate<E>>,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            interval_fn: None,
            predicate: None,
            name: "retry".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets `maxRetries`. Default: 3 (4 total attempts).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn backoff<I: IntervalFunction + 'static>(mut self, interval_fn: I) -> Self {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Convenience for the §4.5 defaults: 500ms initial, factor 2, 10s cap,
    /// jitter on.
    pub fn exponential_backoff_defaults(self) -> Self {
        self.backoff(ExponentialBackoff::new(
            Duration::from_millis(500),
            2.0,
            Duration::from_millis(10_000),
        ))
    }

    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a callback invoked just before each retry sleep.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        use rpc_resilience_core::FnListener;
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    pub fn build(self) -> RetryConfig<E> {
        RetryConfig {
            max_retries: self.max_retries,
            interval_fn: self.interval_fn.unwrap_or_else(|| {
                Arc::new(ExponentialBackoff::new(
                    Duration::from_millis(500),
                    2.0,
                    Duration::from_millis(10_000),
                ))
            }),
            predicate: self.predicate,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}
