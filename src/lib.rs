//! A bidirectional RPC endpoint over HTTP/2: one process acting as both a
//! server (dispatching named methods against JSON bodies) and a client
//! (invoking methods on peers), fronted by a composed resilience pipeline
//! — timeout, circuit breaker, and retry on outbound calls, a per-method
//! bulkhead on inbound calls — plus JWT RS256 auth and runtime metrics.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod health;
mod lifecycle;
pub mod logging;
pub mod methods;
pub mod metrics;

pub use client::CallOptions;
pub use config::{ConfigError, EndpointConfig, EndpointConfigBuilder};
pub use error::{ApiError, ErrorEnvelope};
pub use health::HealthReport;
pub use methods::{Handler, Params};
pub use metrics::MetricsSnapshot;

use client::OutboundClient;
use dispatcher::DispatchState;
use lifecycle::Lifecycle;
use methods::MethodRegistry;
use metrics::MetricsAggregator;
use rpc_jwt::{Verifier, VerifierConfig};
use rpc_resilience_bulkhead::{BulkheadConfig, BulkheadRegistry};
use rpc_resilience_circuitbreaker::{CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Ties the method registry, resilience pipeline, and lifecycle together
/// into the single object an embedding application constructs (component
/// table A-J of the system overview, all wired through here).
pub struct Endpoint {
    config: EndpointConfig,
    methods: MethodRegistry,
    bulkheads: Arc<BulkheadRegistry>,
    circuit_breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<MetricsAggregator>,
    verifier: Option<Arc<Verifier>>,
    client: OutboundClient,
    lifecycle: Lifecycle,
    is_listening: Arc<AtomicBool>,
}

impl Endpoint {
    /// Validates `config` and wires up the resilience registries. Fails
    /// eagerly on any invalid option (§4.1).
    pub fn new(config: EndpointConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let metrics = Arc::new(MetricsAggregator::new());

        let cb_settings = &config.resilience.circuit_breaker;
        let metrics_for_trips = Arc::clone(&metrics);
        let circuit_breakers = Arc::new(CircuitBreakerRegistry::new(
            CircuitBreakerConfig::builder()
                .failure_threshold(cb_settings.failure_threshold)
                .recovery_timeout(Duration::from_millis(cb_settings.recovery_timeout_ms))
                .success_threshold(cb_settings.success_threshold)
                .on_state_transition(move |_from, to| {
                    if to == CircuitState::Open {
                        metrics_for_trips.record_circuit_breaker_trip();
                    }
                })
                .build(),
        ));

        let bulkheads = Arc::new(BulkheadRegistry::new());
        for (name, settings) in &config.method_bulkheads {
            bulkheads.register(
                name.clone(),
                BulkheadConfig::builder()
                    .max_concurrent(settings.max_concurrent)
                    .max_queue(settings.max_queue)
                    .queue_timeout(Duration::from_millis(settings.queue_timeout_ms))
                    .build(),
            );
        }

        let verifier = if config.jwt_auth {
            let pem = config
                .jwt_public_key
                .as_ref()
                .expect("validate() rejects jwt_auth without a public key");
            let mut vconfig = VerifierConfig::from_rsa_pem(pem.as_bytes())
                .map_err(|_| ConfigError::InvalidJwtPublicKey)?;
            if let Some(iss) = &config.jwt_issuer {
                vconfig = vconfig.issuer(iss.clone());
            }
            if let Some(aud) = &config.jwt_audience {
                vconfig = vconfig.audience(aud.clone());
            }
            Some(Arc::new(Verifier::new(vconfig)))
        } else {
            None
        };

        let client = OutboundClient::new(
            Arc::clone(&circuit_breakers),
            Arc::clone(&metrics),
            config.effective_retry(),
            config.resilience.timeout.connection_timeout(),
            config.resilience.timeout.request_timeout(),
        );

        let is_listening = Arc::new(AtomicBool::new(false));
        let lifecycle = Lifecycle::new(Arc::clone(&is_listening));

        Ok(Self {
            config,
            methods: MethodRegistry::new(),
            bulkheads,
            circuit_breakers,
            metrics,
            verifier,
            client,
            lifecycle,
            is_listening,
        })
    }

    /// Registers (or replaces) a method handler. Chainable so callers can
    /// register several methods fluently before `start()`.
    pub fn method(&self, name: impl Into<String>, handler: impl Handler + 'static) -> &Self {
        self.methods.register(name, handler);
        self
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.names()
    }

    /// Invokes `method_name` on `service_url` through the composed
    /// outbound pipeline: gate, retry, timeout, transport (§4.6).
    pub async fn call(
        &self,
        service_url: &str,
        method_name: &str,
        params: Value,
        options: CallOptions,
    ) -> Result<Value, ApiError> {
        self.client.call(service_url, method_name, params, options).await
    }

    /// Binds the HTTP/2 listener, if `startServer` is set or any methods
    /// are registered (§4.1). A no-op otherwise, so a client-only
    /// endpoint never opens a socket.
    pub async fn start(&self) -> Result<(), ApiError> {
        if !self.config.start_server && self.methods.is_empty() {
            return Ok(());
        }
        let router = dispatcher::router(self.dispatch_state());
        // Test builds never install global signal handlers (§9).
        let install_signal_handlers = !cfg!(test);
        self.lifecycle
            .start(&self.config.host, self.config.port, router, install_signal_handlers)
            .await
    }

    /// Idempotent graceful shutdown with a force-close fallback (§4.8).
    pub async fn stop(&self, timeout: Duration) {
        self.lifecycle.stop(timeout, &self.bulkheads).await;
    }

    pub fn is_listening(&self) -> bool {
        self.lifecycle.is_listening()
    }

    /// The bound address once `start()` has succeeded. Mainly useful in
    /// tests that bind an ephemeral port (0) and need to learn which one
    /// was assigned.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.lifecycle.local_addr()
    }

    pub fn reset_circuit_breaker(&self, target: &str) {
        self.circuit_breakers.reset(target);
    }

    /// Supplemented beyond the distilled contract (SPEC_FULL §4): manual
    /// operational override, alongside the spec's `resetCircuitBreaker`.
    pub fn force_circuit_open(&self, target: &str) {
        self.circuit_breakers.force_open(target);
    }

    pub fn force_circuit_closed(&self, target: &str) {
        self.circuit_breakers.reset(target);
    }

    pub fn resilience_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(&self.circuit_breakers, &self.bulkheads)
    }

    pub fn health_report(&self) -> HealthReport {
        health::health_report(&self.dispatch_state())
    }

    fn dispatch_state(&self) -> DispatchState {
        DispatchState {
            methods: self.methods.clone(),
            bulkheads: Arc::clone(&self.bulkheads),
            circuit_breakers: Arc::clone(&self.circuit_breakers),
            metrics: Arc::clone(&self.metrics),
            verifier: self.verifier.clone(),
            excluded_paths: Arc::new(self.config.excluded_paths.clone()),
            cors: self.config.cors.then(|| self.config.cors_options.clone()),
            is_listening: Arc::clone(&self.is_listening),
            jwt_auth_enabled: self.config.jwt_auth,
        }
    }
}
