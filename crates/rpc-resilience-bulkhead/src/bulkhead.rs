use crate::config::BulkheadConfig;
use crate::error::{BulkheadRejectedError, RejectReason};
use crate::events::BulkheadEvent;
use rpc_resilience_core::EventListeners;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Per-method admission control state (§4.4).
///
/// `Semaphore` already grants permits in FIFO order, which gives us the
/// "admission order equals enqueue order" guarantee for free; `waiting`
/// bounds how many callers may be parked on the semaphore at once so a
/// queue-full call can be rejected without ever awaiting.
pub struct Bulkhead {
    method: String,
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    rejected_total: AtomicUsize,
    config: BulkheadConfig,
    listeners: Arc<EventListeners<BulkheadEvent>>,
}

/// A held admission slot. Dropping it releases the slot and emits
/// `CallFinished`.
pub struct BulkheadPermit {
    method: String,
    start: Instant,
    listeners: Arc<EventListeners<BulkheadEvent>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        self.listeners.emit(&BulkheadEvent::CallFinished {
            method: self.method.clone(),
            timestamp: Instant::now(),
            duration: self.start.elapsed(),
        });
    }
}

impl Bulkhead {
    pub fn new(method: impl Into<String>, config: BulkheadConfig) -> Self {
        let method = method.into();
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            waiting: AtomicUsize::new(0),
            rejected_total: AtomicUsize::new(0),
            config,
            listeners: Arc::new(EventListeners::new()),
            method,
        }
    }

    pub fn listeners(&self) -> &EventListeners<BulkheadEvent> {
        &self.listeners
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected_total.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> usize {
        self.config.max_concurrent - self.semaphore.available_permits()
    }

    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Attempts to admit a call, per the §4.4 algorithm.
    pub async fn admit(&self) -> Result<BulkheadPermit, BulkheadRejectedError> {
        if let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() {
            return Ok(self.grant(permit));
        }

        if self.waiting.load(Ordering::Acquire) >= self.config.max_queue {
            self.reject(RejectReason::Capacity);
            return Err(BulkheadRejectedError {
                method: self.method.clone(),
                reason: RejectReason::Capacity,
            });
        }

        self.waiting.fetch_add(1, Ordering::AcqRel);
        self.listeners.emit(&BulkheadEvent::CallQueued {
            method: self.method.clone(),
            timestamp: Instant::now(),
        });

        let result = tokio::time::timeout(
            self.config.queue_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;
        self.waiting.fetch_sub(1, Ordering::AcqRel);

        match result {
            Ok(Ok(permit)) => Ok(self.grant(permit)),
            Ok(Err(_)) => unreachable!("bulkhead semaphore is never closed"),
            Err(_) => {
                self.reject(RejectReason::QueueTimeout);
                Err(BulkheadRejectedError {
                    method: self.method.clone(),
                    reason: RejectReason::QueueTimeout,
                })
            }
        }
    }

    fn grant(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        let active = self.active();
        self.listeners.emit(&BulkheadEvent::CallPermitted {
            method: self.method.clone(),
            timestamp: Instant::now(),
            active,
        });

        #[cfg(feature = "metrics")]
        gauge!("bulkhead_active", "method" => self.method.clone()).set(active as f64);

        BulkheadPermit {
            method: self.method.clone(),
            start: Instant::now(),
            listeners: Arc::clone(&self.listeners),
            _permit: permit,
        }
    }

    fn reject(&self, reason: RejectReason) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
        self.listeners.emit(&BulkheadEvent::CallRejected {
            method: self.method.clone(),
            timestamp: Instant::now(),
            reason,
        });

        #[cfg(feature = "metrics")]
        counter!("bulkhead_rejected_total", "method" => self.method.clone(), "reason" => reason.as_str())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %self.method, reason = reason.as_str(), "bulkhead rejected call");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_max_concurrent() {
        let b = Bulkhead::new(
            "m",
            BulkheadConfig::builder().max_concurrent(2).build(),
        );
        let p1 = b.admit().await.unwrap();
        let p2 = b.admit().await.unwrap();
        assert_eq!(b.active(), 2);
        drop(p1);
        drop(p2);
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_capacity_when_queue_full() {
        let b = Bulkhead::new(
            "m",
            BulkheadConfig::builder()
                .max_concurrent(1)
                .max_queue(0)
                .build(),
        );
        let _p1 = b.admit().await.unwrap();
        let err = b.admit().await.unwrap_err();
        assert_eq!(err.reason, RejectReason::Capacity);
        assert_eq!(b.rejected_total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn queue_timeout_rejects_after_waiting() {
        let b = Bulkhead::new(
            "m",
            BulkheadConfig::builder()
                .max_concurrent(1)
                .max_queue(1)
                .queue_timeout(Duration::from_millis(50))
                .build(),
        );
        let _p1 = b.admit().await.unwrap();
        let handle = tokio::spawn(async move { b.admit().await });
        tokio::time::advance(Duration::from_millis(60)).await;
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.reason, RejectReason::QueueTimeout);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_call_is_admitted_once_a_slot_frees() {
        let b = Arc::new(Bulkhead::new(
            "m",
            BulkheadConfig::builder()
                .max_concurrent(1)
                .max_queue(1)
                .queue_timeout(Duration::from_secs(10))
                .build(),
        ));
        let p1 = b.admit().await.unwrap();
        let b2 = Arc::clone(&b);
        let handle = tokio::spawn(async move { b2.admit().await });
        tokio::task::yield_now().await;
        drop(p1);
        let permit = handle.await.unwrap().unwrap();
        assert_eq!(b.active(), 1);
        drop(permit);
    }
}
