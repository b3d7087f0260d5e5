//! Events emitted by the time limiter.

use rpc_resilience_core::ResilienceEvent;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum TimeLimiterEvent {
    Success {
        name: String,
        timestamp: Instant,
        duration: Duration,
    },
    Error {
        name: String,
        timestamp: Instant,
        duration: Duration,
    },
    Timeout {
        name: String,
        timestamp: Instant,
        timeout_duration: Duration,
    },
}

impl ResilienceEvent for TimeLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TimeLimiterEvent::Success { .. } => "success",
            TimeLimiterEvent::Error { .. } => "error",
            TimeLimiterEvent::Timeout { .. } => "timeout",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TimeLimiterEvent::Success { timestamp, .. }
            | TimeLimiterEvent::Error { timestamp, .. }
            | TimeLimiterEvent::Timeout { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TimeLimiterEvent::Success { name, .. }
            | TimeLimiterEvent::Error { name, .. }
            | TimeLimiterEvent::Timeout { name, .. } => name,
        }
    }
}
