//! Error types for the bulkhead pattern.

use thiserror::Error;

/// Why a bulkhead rejected a call, matching the two rejection reasons in
/// `METHOD_BULKHEAD_EXCEEDED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The method is at `max_concurrent` and its queue is already at
    /// `max_queue`; the call was rejected without ever waiting.
    Capacity,
    /// The call queued but `queue_timeout` elapsed before a slot freed up.
    QueueTimeout,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Capacity => "capacity",
            RejectReason::QueueTimeout => "queue_timeout",
        }
    }
}

/// The bulkhead for `method` rejected the call.
#[derive(Debug, Clone, Error)]
#[error("bulkhead exceeded for method '{method}': {}", .reason.as_str())]
pub struct BulkheadRejectedError {
    pub method: String,
    pub reason: RejectReason,
}
