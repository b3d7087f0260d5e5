//! Runtime metrics aggregator (§4.9 snapshot contract, Metrics Aggregator
//! component I).
//!
//! Monotonic counters are plain atomics (§5: "may be updated lock-free").
//! The running mean of response time is guarded by a `Mutex` rather than a
//! CAS loop on a bit-cast `f64` — simpler, and the critical section is a
//! single multiply-add, so contention is not a concern.

use rpc_resilience_bulkhead::BulkheadRegistry;
use rpc_resilience_circuitbreaker::{CircuitBreakerRegistry, CircuitState};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Default)]
struct ResponseTimeMean {
    count: u64,
    mean_ms: f64,
}

impl ResponseTimeMean {
    fn observe(&mut self, sample_ms: f64) {
        self.count += 1;
        self.mean_ms += (sample_ms - self.mean_ms) / self.count as f64;
    }
}

/// Aggregates the counters and snapshots exposed via `/health-check` and
/// any embedder-facing metrics API.
pub struct MetricsAggregator {
    started_at: Instant,
    request_count: AtomicU64,
    error_count: AtomicU64,
    retry_count: AtomicU64,
    auth_failures: AtomicU64,
    timeout_count: AtomicU64,
    circuit_breaker_trips: AtomicU64,
    bulkhead_rejections: AtomicU64,
    response_time: Mutex<ResponseTimeMean>,
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            request_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            retry_count: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            timeout_count: AtomicU64::new(0),
            circuit_breaker_trips: AtomicU64::new(0),
            bulkhead_rejections: AtomicU64::new(0),
            response_time: Mutex::new(ResponseTimeMean::default()),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Records the completion of one dispatched request: increments
    /// `requestCount`, `errorCount` when non-success, and folds the
    /// elapsed time into the running mean (§4.7 step 11).
    pub fn record_request(&self, success: bool, elapsed_ms: f64) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.response_time
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe(elapsed_ms);
    }

    pub fn record_retry(&self) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeout_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_circuit_breaker_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bulkhead_rejection(&self) {
        self.bulkhead_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Builds the full nested snapshot described in §3's "Metrics
    /// snapshot" data model entry.
    pub fn snapshot(
        &self,
        circuit_breakers: &CircuitBreakerRegistry,
        bulkheads: &BulkheadRegistry,
    ) -> MetricsSnapshot {
        let mean_ms = self
            .response_time
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .mean_ms;

        let circuits = circuit_breakers
            .snapshots()
            .into_iter()
            .map(|(target, snapshot)| {
                (
                    target,
                    CircuitSnapshotView {
                        state: circuit_state_label(snapshot.state),
                        failure_count: snapshot.failure_count,
                        success_count: snapshot.success_count,
                    },
                )
            })
            .collect();

        let methods = bulkheads
            .snapshots()
            .into_iter()
            .map(|(method, active, waiting, rejected_total)| {
                (
                    method,
                    BulkheadSnapshotView {
                        active,
                        waiting,
                        rejected_total,
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            request_count: self.request_count.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            timeout_count: self.timeout_count.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
            bulkhead_rejections: self.bulkhead_rejections.load(Ordering::Relaxed),
            mean_response_time_ms: mean_ms,
            uptime_ms: self.uptime_ms(),
            circuit_breakers: circuits,
            bulkheads: methods,
        }
    }
}

fn circuit_state_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "CLOSED",
        CircuitState::Open => "OPEN",
        CircuitState::HalfOpen => "HALF_OPEN",
    }
}

#[derive(Debug, Serialize)]
pub struct CircuitSnapshotView {
    pub state: &'static str,
    pub failure_count: u32,
    pub success_count: u32,
}

#[derive(Debug, Serialize)]
pub struct BulkheadSnapshotView {
    pub active: usize,
    pub waiting: usize,
    pub rejected_total: usize,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub request_count: u64,
    pub error_count: u64,
    pub retry_count: u64,
    pub auth_failures: u64,
    pub timeout_count: u64,
    pub circuit_breaker_trips: u64,
    pub bulkhead_rejections: u64,
    pub mean_response_time_ms: f64,
    pub uptime_ms: u64,
    pub circuit_breakers: std::collections::HashMap<String, CircuitSnapshotView>,
    pub bulkheads: std::collections::HashMap<String, BulkheadSnapshotView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpc_resilience_circuitbreaker::CircuitBreakerConfig;

    #[test]
    fn running_mean_matches_incremental_formula() {
        let metrics = MetricsAggregator::new();
        metrics.record_request(true, 10.0);
        metrics.record_request(true, 20.0);
        metrics.record_request(false, 30.0);

        let breakers = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
        let bulkheads = BulkheadRegistry::new();
        let snapshot = metrics.snapshot(&breakers, &bulkheads);

        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.error_count, 1);
        assert!((snapshot.mean_response_time_ms - 20.0).abs() < 1e-9);
    }
}
