//! Configuration for the per-method bulkhead.

use std::time::Duration;

/// Admission-control limits for a single method.
#[derive(Debug, Clone)]
pub struct BulkheadConfig {
    /// Maximum number of concurrently executing calls for this method.
    pub max_concurrent: usize,
    /// Maximum number of calls allowed to queue once `max_concurrent` is
    /// reached. A queue-full call is rejected immediately with reason
    /// `capacity`.
    pub max_queue: usize,
    /// How long a queued call waits for a free slot before being rejected
    /// with reason `queue_timeout`.
    pub queue_timeout: Duration,
}

impl Default for BulkheadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            max_queue: 20,
            queue_timeout: Duration::from_millis(10_000),
        }
    }
}

impl BulkheadConfig {
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::default()
    }
}

/// Builder for [`BulkheadConfig`].
#[derive(Debug, Clone, Default)]
pub struct BulkheadConfigBuilder {
    inner: Option<BulkheadConfig>,
}

impl BulkheadConfigBuilder {
    fn base(&mut self) -> &mut BulkheadConfig {
        self.inner.get_or_insert_with(BulkheadConfig::default)
    }

    /// Sets the maximum concurrent calls. Default: 10.
    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.base().max_concurrent = n;
        self
    }

    /// Sets the maximum queue depth. Default: 20.
    pub fn max_queue(mut self, n: usize) -> Self {
        self.base().max_queue = n;
        self
    }

    /// Sets the queue wait timeout. Default: 10s.
    pub fn queue_timeout(mut self, d: Duration) -> Self {
        self.base().queue_timeout = d;
        self
    }

    pub fn build(self) -> BulkheadConfig {
        self.inner.unwrap_or_default()
    }
}
