//! Errors produced by the time limiter.

use std::fmt;

/// Wraps the inner service's error with a timeout variant, mirroring
/// `ResilienceError`'s "wrap, don't replace" shape but scoped to this one
/// pattern so callers can use `?` without pulling in the full error enum.
#[derive(Debug, Clone)]
pub enum TimeLimiterError<E> {
    /// The operation did not complete within the configured duration.
    Timeout,
    /// The operation completed but failed.
    Inner(E),
}

impl<E> TimeLimiterError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeLimiterError::Timeout)
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            TimeLimiterError::Inner(e) => Some(e),
            TimeLimiterError::Timeout => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for TimeLimiterError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLimiterError::Timeout => write!(f, "operation timed out"),
            TimeLimiterError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TimeLimiterError<E> {}
