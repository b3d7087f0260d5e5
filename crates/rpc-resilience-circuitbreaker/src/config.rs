//! Configuration for the circuit breaker pattern.

use crate::events::CircuitBreakerEvent;
use rpc_resilience_core::EventListeners;
use std::time::Duration;

/// Configuration shared by every circuit in a [`crate::CircuitBreakerRegistry`].
///
/// Unlike a per-service tower layer, a single `CircuitBreakerConfig` governs
/// every target key the registry shards over — a service registering one
/// client gets one failure threshold / recovery timeout policy for all the
/// URLs it calls.
#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in CLOSED before the circuit trips to OPEN.
    pub failure_threshold: u32,
    /// How long the circuit stays OPEN before probing again in HALF_OPEN.
    pub recovery_timeout: Duration,
    /// Consecutive successes in HALF_OPEN needed to return to CLOSED.
    pub success_threshold: u32,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 3,
            event_listeners: EventListeners::new(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }
}

/// Builder for [`CircuitBreakerConfig`].
#[derive(Clone, Default)]
pub struct CircuitBreakerConfigBuilder {
    inner: Option<CircuitBreakerConfig>,
}

impl CircuitBreakerConfigBuilder {
    fn base(&mut self) -> &mut CircuitBreakerConfig {
        self.inner.get_or_insert_with(CircuitBreakerConfig::default)
    }

    /// Sets the failure threshold. Default: 5.
    pub fn failure_threshold(mut self, n: u32) -> Self {
        self.base().failure_threshold = n;
        self
    }

    /// Sets the recovery timeout. Default: 60s.
    pub fn recovery_timeout(mut self, d: Duration) -> Self {
        self.base().recovery_timeout = d;
        self
    }

    /// Sets the half-open success threshold. Default: 3.
    pub fn success_threshold(mut self, n: u32) -> Self {
        self.base().success_threshold = n;
        self
    }

    /// Register a callback for state transition events.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::CircuitState, crate::CircuitState) + Send + Sync + 'static,
    {
        use rpc_resilience_core::FnListener;
        self.base()
            .event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition { from, to, .. } = event {
                    f(*from, *to);
                }
            }));
        self
    }

    pub fn build(self) -> CircuitBreakerConfig {
        self.inner.unwrap_or_default()
    }
}
