//! Timeout enforcement for the `rpc-endpoint` resilience pipeline.
//!
//! Used twice per outbound attempt: once with `connectionTimeout` around
//! session establishment, once with `requestTimeout` around the full
//! send+receive.

mod error;
mod events;

pub use error::TimeLimiterError;
pub use events::TimeLimiterEvent;

use rpc_resilience_core::EventListeners;
use std::future::Future;
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::counter;

/// A named timeout boundary with its own event sink.
pub struct TimeLimiter {
    name: String,
    listeners: EventListeners<TimeLimiterEvent>,
}

impl TimeLimiter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listeners: EventListeners::new(),
        }
    }

    pub fn listeners(&self) -> &EventListeners<TimeLimiterEvent> {
        &self.listeners
    }

    /// Runs `op`, failing with [`TimeLimiterError::Timeout`] if it does not
    /// complete within `duration`.
    pub async fn call<F, T, E>(&self, duration: Duration, op: F) -> Result<T, TimeLimiterError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        match tokio::time::timeout(duration, op).await {
            Ok(Ok(value)) => {
                self.listeners.emit(&TimeLimiterEvent::Success {
                    name: self.name.clone(),
                    timestamp: Instant::now(),
                    duration: start.elapsed(),
                });
                Ok(value)
            }
            Ok(Err(err)) => {
                self.listeners.emit(&TimeLimiterEvent::Error {
                    name: self.name.clone(),
                    timestamp: Instant::now(),
                    duration: start.elapsed(),
                });
                Err(TimeLimiterError::Inner(err))
            }
            Err(_elapsed) => {
                self.listeners.emit(&TimeLimiterEvent::Timeout {
                    name: self.name.clone(),
                    timestamp: Instant::now(),
                    timeout_duration: duration,
                });

                #[cfg(feature = "metrics")]
                counter!("timelimiter_timeouts_total", "name" => self.name.clone()).increment(1);
                #[cfg(feature = "tracing")]
                tracing::debug!(name = %self.name, ?duration, "operation timed out");

                Err(TimeLimiterError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_within_budget() {
        let tl = TimeLimiter::new("t");
        let result = tl
            .call(Duration::from_millis(100), async { Ok::<_, ()>(7) })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_when_operation_never_resolves() {
        let tl = TimeLimiter::new("t");
        let result = tl
            .call(Duration::from_millis(10), async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ()>(())
            })
            .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn propagates_inner_error() {
        let tl = TimeLimiter::new("t");
        let result: Result<(), _> = tl
            .call(Duration::from_millis(100), async { Err("boom") })
            .await;
        assert_eq!(result.unwrap_err().into_inner(), Some("boom"));
    }
}
