//! Sharded registry of per-target circuits.

use crate::circuit::Circuit;
use crate::config::CircuitBreakerConfig;
use crate::error::CircuitOpenError;
use crate::events::CircuitBreakerEvent;
use dashmap::DashMap;
use rpc_resilience_core::EventListeners;
use std::sync::Mutex;

/// Holds one [`Circuit`] per target (service URL), created lazily on first
/// use and sharing a single [`CircuitBreakerConfig`] and event sink.
///
/// Cloning is cheap: `DashMap` and `EventListeners` are themselves
/// reference-counted internally, so a `CircuitBreakerRegistry` can be
/// wrapped in an `Arc` once and handed to every outbound client.
pub struct CircuitBreakerRegistry {
    circuits: DashMap<String, Mutex<Circuit>>,
    config: CircuitBreakerConfig,
    listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreakerRegistry {
    /// Builds a registry from `config`, carrying over any listeners
    /// registered on its builder (e.g. via `on_state_transition`).
    pub fn new(mut config: CircuitBreakerConfig) -> Self {
        let listeners = std::mem::take(&mut config.event_listeners);
        Self {
            circuits: DashMap::new(),
            config,
            listeners,
        }
    }

    pub fn listeners(&self) -> &EventListeners<CircuitBreakerEvent> {
        &self.listeners
    }

    /// Checks whether a call to `target` may proceed, creating its circuit
    /// on first use.
    pub fn gate(&self, target: &str) -> Result<(), CircuitOpenError> {
        let entry = self
            .circuits
            .entry(target.to_string())
            .or_insert_with(|| Mutex::new(Circuit::new()));
        let mut circuit = entry.lock().unwrap_or_else(|e| e.into_inner());
        if circuit.try_acquire(target, &self.config, &self.listeners) {
            Ok(())
        } else {
            Err(CircuitOpenError {
                target: target.to_string(),
            })
        }
    }

    pub fn record_success(&self, target: &str) {
        if let Some(entry) = self.circuits.get(target) {
            let mut circuit = entry.lock().unwrap_or_else(|e| e.into_inner());
            circuit.record_success(target, &self.config, &self.listeners);
        }
    }

    pub fn record_failure(&self, target: &str) {
        let entry = self
            .circuits
            .entry(target.to_string())
            .or_insert_with(|| Mutex::new(Circuit::new()));
        let mut circuit = entry.lock().unwrap_or_else(|e| e.into_inner());
        circuit.record_failure(target, &self.config, &self.listeners);
    }

    /// Manually resets a target's circuit to CLOSED.
    pub fn reset(&self, target: &str) {
        if let Some(entry) = self.circuits.get(target) {
            let mut circuit = entry.lock().unwrap_or_else(|e| e.into_inner());
            circuit.reset(target, &self.listeners);
        }
    }

    /// Manually forces a target's circuit to OPEN, e.g. from an admin
    /// endpoint or a chaos test.
    pub fn force_open(&self, target: &str) {
        let entry = self
            .circuits
            .entry(target.to_string())
            .or_insert_with(|| Mutex::new(Circuit::new()));
        let mut circuit = entry.lock().unwrap_or_else(|e| e.into_inner());
        circuit.force_open(target, &self.config, &self.listeners);
    }

    /// Snapshots every known target's state, for a metrics/health report.
    pub fn snapshots(&self) -> Vec<(String, crate::circuit::CircuitSnapshot)> {
        self.circuits
            .iter()
            .map(|entry| {
                let circuit = entry.value().lock().unwrap_or_else(|e| e.into_inner());
                (entry.key().clone(), circuit.snapshot())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn targets_are_independent() {
        let registry = CircuitBreakerRegistry::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(1)
                .recovery_timeout(Duration::from_secs(60))
                .build(),
        );
        registry.record_failure("a");
        assert!(registry.gate("a").is_err());
        assert!(registry.gate("b").is_ok());
    }

    #[test]
    fn unknown_target_gates_open() {
        let registry = CircuitBreakerRegistry::new(CircuitBreakerConfig::default());
        assert!(registry.gate("never-seen").is_ok());
    }
}
