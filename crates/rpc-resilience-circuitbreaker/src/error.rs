//! Errors produced by the circuit breaker.

use thiserror::Error;

/// The circuit is open for the given target and the call was rejected
/// without performing I/O.
#[derive(Debug, Clone, Error)]
#[error("circuit open for target '{target}'")]
pub struct CircuitOpenError {
    pub target: String,
}
