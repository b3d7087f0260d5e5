//! A common error wrapper that eliminates per-layer `From` boilerplate
//! when composing multiple resilience patterns.
//!
//! Each pattern crate still defines its own concrete error type
//! (`CircuitBreakerError`, `BulkheadError`, ...); `ResilienceError<E>` is
//! available to embedding code that wants to compose several layers
//! behind a single error type without writing a `From` impl per layer.

use std::fmt;
use std::time::Duration;

/// A unified error type spanning every resilience layer plus the
/// application's own error type `E`.
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// A timeout occurred in the named layer.
    Timeout { layer: &'static str },
    /// Circuit breaker is open, call rejected.
    CircuitOpen { name: Option<String> },
    /// Bulkhead is at capacity, call rejected.
    BulkheadFull {
        concurrent_calls: usize,
        max_concurrent: usize,
    },
    /// Retry budget or queue rejected the call.
    RateLimited { retry_after: Option<Duration> },
    /// The wrapped application service returned an error.
    Application(E),
}

impl<E: fmt::Display> fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::Timeout { layer } => write!(f, "timeout in {layer}"),
            ResilienceError::CircuitOpen { name } => match name {
                Some(n) => write!(f, "circuit breaker '{n}' is open"),
                None => write!(f, "circuit breaker is open"),
            },
            ResilienceError::BulkheadFull {
                concurrent_calls,
                max_concurrent,
            } => write!(f, "bulkhead full ({concurrent_calls}/{max_concurrent})"),
            ResilienceError::RateLimited { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limited, retry after {d:?}"),
                None => write!(f, "rate limited"),
            },
            ResilienceError::Application(e) => write!(f, "application error: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for ResilienceError<E> {}

impl<E> ResilienceError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResilienceError::Timeout { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, ResilienceError::BulkheadFull { .. })
    }

    pub fn application_error(self) -> Option<E> {
        match self {
            ResilienceError::Application(e) => Some(e),
            _ => None,
        }
    }

    pub fn map_application<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::Timeout { layer } => ResilienceError::Timeout { layer },
            ResilienceError::CircuitOpen { name } => ResilienceError::CircuitOpen { name },
            ResilienceError::BulkheadFull {
                concurrent_calls,
                max_concurrent,
            } => ResilienceError::BulkheadFull {
                concurrent_calls,
                max_concurrent,
            },
            ResilienceError::RateLimited { retry_after } => {
                ResilienceError::RateLimited { retry_after }
            }
            ResilienceError::Application(e) => ResilienceError::Application(f(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_application_preserves_non_application_variants() {
        let err: ResilienceError<String> = ResilienceError::Timeout { layer: "retry" };
        let mapped = err.map_application(|s| s.len());
        assert!(mapped.is_timeout());
    }

    #[test]
    fn map_application_transforms_application_variant() {
        let err: ResilienceError<String> = ResilienceError::Application("boom".into());
        let mapped = err.map_application(|s| s.len());
        assert_eq!(mapped.application_error(), Some(4));
    }
}
