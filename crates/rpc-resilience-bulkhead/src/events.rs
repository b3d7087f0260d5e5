//! Events emitted by the bulkhead.

use crate::error::RejectReason;
use rpc_resilience_core::ResilienceEvent;
use std::time::{Duration, Instant};

/// Observability events emitted by a method's [`crate::Bulkhead`].
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A call was admitted immediately or after queuing.
    CallPermitted {
        method: String,
        timestamp: Instant,
        active: usize,
    },
    /// A call queued behind the concurrency limit.
    CallQueued { method: String, timestamp: Instant },
    /// A call was rejected, either at capacity or after a queue timeout.
    CallRejected {
        method: String,
        timestamp: Instant,
        reason: RejectReason,
    },
    /// An admitted call finished, releasing its slot.
    CallFinished {
        method: String,
        timestamp: Instant,
        duration: Duration,
    },
}

impl ResilienceEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallQueued { .. } => "call_queued",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::CallFinished { .. } => "call_finished",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallQueued { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::CallFinished { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { method, .. }
            | BulkheadEvent::CallQueued { method, .. }
            | BulkheadEvent::CallRejected { method, .. }
            | BulkheadEvent::CallFinished { method, .. } => method,
        }
    }
}
