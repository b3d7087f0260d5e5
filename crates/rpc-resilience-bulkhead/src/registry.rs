//! Per-method bulkhead registry.

use crate::bulkhead::{Bulkhead, BulkheadPermit};
use crate::config::BulkheadConfig;
use crate::error::BulkheadRejectedError;
use dashmap::DashMap;

/// Holds one [`Bulkhead`] per registered method name.
///
/// Each method's admission state (active count, queue, rejection counter)
/// is serialized independently, matching the per-method isolation the
/// pattern exists to provide: a flood against one method cannot starve
/// another.
#[derive(Default)]
pub struct BulkheadRegistry {
    bulkheads: DashMap<String, Bulkhead>,
}

impl BulkheadRegistry {
    pub fn new() -> Self {
        Self {
            bulkheads: DashMap::new(),
        }
    }

    /// Registers (or replaces) the bulkhead configuration for `method`.
    pub fn register(&self, method: impl Into<String>, config: BulkheadConfig) {
        let method = method.into();
        self.bulkheads
            .insert(method.clone(), Bulkhead::new(method, config));
    }

    /// Admits a call for `method`. A method with no registered bulkhead
    /// admits immediately (disabled bulkhead, §4.4 step 1).
    pub async fn admit(&self, method: &str) -> Result<Option<BulkheadPermit>, BulkheadRejectedError> {
        match self.bulkheads.get(method) {
            Some(bulkhead) => bulkhead.admit().await.map(Some),
            None => Ok(None),
        }
    }

    pub fn active(&self, method: &str) -> Option<usize> {
        self.bulkheads.get(method).map(|b| b.active())
    }

    pub fn waiting(&self, method: &str) -> Option<usize> {
        self.bulkheads.get(method).map(|b| b.waiting())
    }

    pub fn rejected_total(&self, method: &str) -> Option<usize> {
        self.bulkheads.get(method).map(|b| b.rejected_total())
    }

    /// Snapshots active/waiting/rejected for every registered method, for
    /// the metrics/health report.
    pub fn snapshots(&self) -> Vec<(String, usize, usize, usize)> {
        self.bulkheads
            .iter()
            .map(|entry| {
                let b = entry.value();
                (entry.key().clone(), b.active(), b.waiting(), b.rejected_total())
            })
            .collect()
    }
}
