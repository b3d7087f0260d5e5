//! Events emitted by the circuit breaker.

use crate::circuit::CircuitState;
use rpc_resilience_core::ResilienceEvent;
use std::time::Instant;

/// Observability events emitted by a [`crate::Circuit`].
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// A call was permitted through the circuit.
    CallPermitted {
        target: String,
        timestamp: Instant,
        state: CircuitState,
    },
    /// A call was rejected because the circuit is OPEN.
    CallRejected { target: String, timestamp: Instant },
    /// A state transition occurred.
    StateTransition {
        target: String,
        timestamp: Instant,
        from: CircuitState,
        to: CircuitState,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::StateTransition { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::CallPermitted { target, .. }
            | CircuitBreakerEvent::CallRejected { target, .. }
            | CircuitBreakerEvent::StateTransition { target, .. } => target,
        }
    }
}
