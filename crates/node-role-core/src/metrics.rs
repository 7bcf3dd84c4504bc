//! Patch outcome counters.
//!
//! The executor only sees [`PatchRecorder`]; [`PatchMetrics`] backs it with
//! prometheus counters that can be scraped from a `/metrics` endpoint.
//!
//! ## Metrics
//! - `node_role_patch_success_total` - patches that landed
//! - `node_role_patch_failure_total` - patches dropped after the retry budget
//!
//! Neither carries labels.

use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Name of the success counter
pub const PATCH_SUCCESS_TOTAL: &str = "node_role_patch_success_total";
/// Name of the failure counter
pub const PATCH_FAILURE_TOTAL: &str = "node_role_patch_failure_total";

/// Sink for terminal patch outcomes. Implementations must tolerate
/// concurrent calls.
pub trait PatchRecorder: Send + Sync {
    /// A patch landed
    fn record_success(&self);
    /// A patch was dropped after exhausting its retries
    fn record_failure(&self);
}

/// Prometheus-backed patch counters.
#[derive(Clone, Debug)]
pub struct PatchMetrics {
    success: IntCounter,
    failure: IntCounter,
    registry: Arc<Registry>,
}

impl PatchMetrics {
    /// Create counters and register them with `registry`.
    ///
    /// # Errors
    ///
    /// Fails if counters with the same names are already registered.
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let success = IntCounter::new(
            PATCH_SUCCESS_TOTAL,
            "Total number of successful node role patches",
        )?;
        registry.register(Box::new(success.clone()))?;

        let failure = IntCounter::new(
            PATCH_FAILURE_TOTAL,
            "Total number of failed node role patches",
        )?;
        registry.register(Box::new(failure.clone()))?;

        Ok(Self {
            success,
            failure,
            registry,
        })
    }

    /// Create counters in a fresh registry.
    ///
    /// # Errors
    ///
    /// Propagates counter construction errors.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Current success count
    #[must_use]
    pub fn success_total(&self) -> u64 {
        self.success.get()
    }

    /// Current failure count
    #[must_use]
    pub fn failure_total(&self) -> u64 {
        self.failure.get()
    }

    /// Registry holding the counters
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl PatchRecorder for PatchMetrics {
    fn record_success(&self) {
        self.success.inc();
    }

    fn record_failure(&self) {
        self.failure.inc();
    }
}
