//! Event system for resilience patterns.
//!
//! Every pattern crate (circuit breaker, bulkhead, retry) defines its own
//! concrete event enum and emits it through an [`EventListeners`]
//! collection, so embedding applications can attach observability hooks
//! without the pattern crate depending on any particular logging or
//! metrics backend.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by resilience patterns.
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g. "state_transition", "call_rejected").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the pattern instance that emitted this event.
    fn pattern_name(&self) -> &str;
}

/// Trait for listening to resilience events.
pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// An [`EventListener`] backed by a plain closure.
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F> {
    /// Wraps a closure as an event listener.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, E> EventListener<E> for FnListener<F>
where
    F: Fn(&E) + Send + Sync,
    E: ResilienceEvent,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

/// A collection of event listeners for a single pattern event type.
#[derive(Clone)]
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ResilienceEvent> EventListeners<E> {
    /// Creates a new empty event listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every registered listener.
    ///
    /// A panicking listener is caught so it cannot prevent the remaining
    /// listeners from running; with the `tracing` feature enabled the
    /// panic is logged as a warning.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(event_type = event.event_type(), "event listener panicked");
            }
        }
    }
}
