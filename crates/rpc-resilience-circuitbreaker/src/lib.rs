//! Per-target circuit breaker for the `rpc-endpoint` outbound resilience
//! pipeline.
//!
//! Unlike a `tower::Layer` wrapping a single service, this crate is keyed:
//! a [`CircuitBreakerRegistry`] shards circuits by target (the remote
//! service URL an outbound RPC call is addressed to), so one registry can
//! guard every outbound destination an endpoint talks to.

mod circuit;
mod config;
mod error;
mod events;
mod registry;

pub use circuit::{Circuit, CircuitSnapshot, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitOpenError;
pub use events::CircuitBreakerEvent;
pub use registry::CircuitBreakerRegistry;
