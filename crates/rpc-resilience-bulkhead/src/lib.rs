//! Per-method bulkhead admission control for the `rpc-endpoint` inbound
//! pipeline.
//!
//! Where the outbound circuit breaker is keyed by target URL, the bulkhead
//! is keyed by method name: each method gets its own active-count limit,
//! bounded FIFO queue, and queue timeout, so a burst against one method
//! cannot starve calls to another.

mod bulkhead;
mod config;
mod error;
mod events;
mod registry;

pub use bulkhead::{Bulkhead, BulkheadPermit};
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::{BulkheadRejectedError, RejectReason};
pub use events::BulkheadEvent;
pub use registry::BulkheadRegistry;
