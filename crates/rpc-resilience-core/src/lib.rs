//! Core infrastructure shared by the `rpc-endpoint` resilience pipeline.
//!
//! This crate provides the pieces every pattern crate (circuit breaker,
//! bulkhead, retry, timelimiter) needs and would otherwise duplicate:
//! - an event system for observability,
//! - a unified error wrapper that eliminates per-layer `From` boilerplate.

pub mod error;
pub mod events;

pub use error::ResilienceError;
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
