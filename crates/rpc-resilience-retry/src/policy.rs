//! Error classification for the retry engine.

use std::sync::Arc;

/// Decides whether a failed attempt's error should be retried.
///
/// The engine itself is agnostic to what "retryable" means for a given
/// error type — the caller supplies the classification (e.g. the outbound
/// client's predicate checks HTTP status codes against `retryOn` and a set
/// of transport-error kinds, short-circuiting hard application error codes).
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
