use crate::config::CircuitBreakerConfig;
use crate::events::CircuitBreakerEvent;
use rpc_resilience_core::EventListeners;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use metrics::counter;

/// The state of a single circuit breaker entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    /// Requests pass; failures accumulate toward `failure_threshold`.
    Closed = 0,
    /// Requests are rejected immediately until `recovery_timeout` elapses.
    Open = 1,
    /// A probing state: requests pass while successes/failures decide the
    /// next transition.
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// A point-in-time snapshot of a circuit's counters, safe to hand out
/// without holding the circuit's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
}

/// Per-target circuit breaker state machine (§4.3).
///
/// `state_atomic` mirrors `state` so other threads can read the current
/// state (e.g. for a health check) without taking the lock that serializes
/// `try_acquire`/`record_success`/`record_failure`.
pub struct Circuit {
    state: CircuitState,
    state_atomic: std::sync::Arc<AtomicU8>,
    failure_count: u32,
    success_count: u32,
    next_attempt_at: Option<Instant>,
    last_transition: Instant,
}

impl Circuit {
    pub(crate) fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic: std::sync::Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            failure_count: 0,
            success_count: 0,
            next_attempt_at: None,
            last_transition: Instant::now(),
        }
    }

    /// Cheap, lock-free read of the current state.
    pub fn state_atomic_handle(&self) -> std::sync::Arc<AtomicU8> {
        std::sync::Arc::clone(&self.state_atomic)
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        CircuitSnapshot {
            state: CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire)),
            failure_count: self.failure_count,
            success_count: self.success_count,
        }
    }

    /// Gate check: does a call get to proceed right now?
    ///
    /// In OPEN, once `recovery_timeout` has elapsed since the last
    /// transition, the *next* gate check flips the circuit to HALF_OPEN and
    /// admits that call as the first probe (§4.3: "on the next gate check,
    /// transition to HALF_OPEN"). Multiple concurrent probes may be
    /// admitted in HALF_OPEN (§9 open question: the reference permits
    /// this).
    pub fn try_acquire(
        &mut self,
        target: &str,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<CircuitBreakerEvent>,
    ) -> bool {
        match self.state {
            CircuitState::Closed => {
                listeners.emit(&CircuitBreakerEvent::CallPermitted {
                    target: target.to_string(),
                    timestamp: Instant::now(),
                    state: self.state,
                });
                true
            }
            CircuitState::Open => {
                let ready = self
                    .next_attempt_at
                    .map(|at| Instant::now() >= at)
                    .unwrap_or(true);
                if ready {
                    self.transition_to(CircuitState::HalfOpen, target, listeners);
                    listeners.emit(&CircuitBreakerEvent::CallPermitted {
                        target: target.to_string(),
                        timestamp: Instant::now(),
                        state: self.state,
                    });
                    true
                } else {
                    listeners.emit(&CircuitBreakerEvent::CallRejected {
                        target: target.to_string(),
                        timestamp: Instant::now(),
                    });
                    false
                }
            }
            CircuitState::HalfOpen => {
                listeners.emit(&CircuitBreakerEvent::CallPermitted {
                    target: target.to_string(),
                    timestamp: Instant::now(),
                    state: self.state,
                });
                true
            }
        }
    }

    pub fn record_success(
        &mut self,
        target: &str,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<CircuitBreakerEvent>,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                self.success_count += 1;
                if self.success_count >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, target, listeners);
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(
        &mut self,
        target: &str,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<CircuitBreakerEvent>,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count += 1;
                if self.failure_count >= config.failure_threshold {
                    self.arm_next_attempt(config);
                    self.transition_to(CircuitState::Open, target, listeners);

                    #[cfg(feature = "metrics")]
                    counter!("circuitbreaker_trips_total", "target" => target.to_string())
                        .increment(1);
                }
            }
            CircuitState::HalfOpen => {
                self.arm_next_attempt(config);
                self.transition_to(CircuitState::Open, target, listeners);
            }
            CircuitState::Open => {}
        }
    }

    /// Resets the circuit to CLOSED with zeroed counters.
    pub fn reset(&mut self, target: &str, listeners: &EventListeners<CircuitBreakerEvent>) {
        self.transition_to(CircuitState::Closed, target, listeners);
    }

    pub fn force_open(
        &mut self,
        target: &str,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<CircuitBreakerEvent>,
    ) {
        self.arm_next_attempt(config);
        self.transition_to(CircuitState::Open, target, listeners);
    }

    fn arm_next_attempt(&mut self, config: &CircuitBreakerConfig) {
        self.next_attempt_at = Some(Instant::now() + config.recovery_timeout);
    }

    fn transition_to(
        &mut self,
        to: CircuitState,
        target: &str,
        listeners: &EventListeners<CircuitBreakerEvent>,
    ) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.state_atomic.store(to as u8, Ordering::Release);
        self.last_transition = Instant::now();
        self.failure_count = 0;
        self.success_count = 0;
        if to != CircuitState::Open {
            self.next_attempt_at = None;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(target = target, ?from, ?to, "circuit breaker state transition");

        listeners.emit(&CircuitBreakerEvent::StateTransition {
            target: target.to_string(),
            timestamp: Instant::now(),
            from,
            to,
        });
    }

    pub fn time_since_transition(&self) -> Duration {
        self.last_transition.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CircuitBreakerConfig {
        CircuitBreakerConfig::builder()
            .failure_threshold(2)
            .success_threshold(2)
            .recovery_timeout(Duration::from_millis(20))
            .build()
    }

    #[test]
    fn opens_after_failure_threshold_consecutive_failures() {
        let listeners = EventListeners::new();
        let config = cfg();
        let mut c = Circuit::new();
        assert!(c.try_acquire("t", &config, &listeners));
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Closed);
        assert!(c.try_acquire("t", &config, &listeners));
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Open);
        assert!(!c.try_acquire("t", &config, &listeners));
    }

    #[test]
    fn success_resets_failure_count_in_closed() {
        let listeners = EventListeners::new();
        let config = cfg();
        let mut c = Circuit::new();
        c.record_failure("t", &config, &listeners);
        c.record_success("t", &config, &listeners);
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_success_threshold_closes_circuit() {
        let listeners = EventListeners::new();
        let config = cfg();
        let mut c = Circuit::new();
        c.record_failure("t", &config, &listeners);
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Open);
        std::thread::sleep(Duration::from_millis(25));
        assert!(c.try_acquire("t", &config, &listeners)); // -> HalfOpen, admitted
        assert_eq!(c.state(), CircuitState::HalfOpen);
        c.record_success("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::HalfOpen);
        c.record_success("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Closed);
        assert_eq!(c.snapshot().failure_count, 0);
        assert_eq!(c.snapshot().success_count, 0);
    }

    #[test]
    fn half_open_failure_reopens_and_rearms() {
        let listeners = EventListeners::new();
        let config = cfg();
        let mut c = Circuit::new();
        c.record_failure("t", &config, &listeners);
        c.record_failure("t", &config, &listeners);
        std::thread::sleep(Duration::from_millis(25));
        c.try_acquire("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::HalfOpen);
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Open);
        assert!(!c.try_acquire("t", &config, &listeners));
    }

    #[test]
    fn reset_returns_to_closed_with_zeroed_counters() {
        let listeners = EventListeners::new();
        let config = cfg();
        let mut c = Circuit::new();
        c.record_failure("t", &config, &listeners);
        c.record_failure("t", &config, &listeners);
        assert_eq!(c.state(), CircuitState::Open);
        c.reset("t", &listeners);
        assert_eq!(c.state(), CircuitState::Closed);
        assert_eq!(c.snapshot().failure_count, 0);
    }
}
