//! Mock NodePatcher for unit testing
//!
//! Records every patch in memory and can be configured to fail, so the
//! executor and handlers can be tested without a cluster.

use crate::error::RoleError;
use crate::patcher::NodePatcher;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy)]
enum FailureMode {
    Never,
    Always,
    FirstN(u32),
}

/// Mock NodePatcher for testing
#[derive(Debug, Clone)]
pub struct MockNodePatcher {
    mode: FailureMode,
    attempts: Arc<AtomicU32>,
    applied: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MockNodePatcher {
    /// A patcher whose writes always land
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(FailureMode::Never)
    }

    /// A patcher whose writes always fail
    #[must_use]
    pub fn failing() -> Self {
        Self::with_mode(FailureMode::Always)
    }

    /// A patcher whose first `n` writes fail
    #[must_use]
    pub fn failing_times(n: u32) -> Self {
        Self::with_mode(FailureMode::FirstN(n))
    }

    fn with_mode(mode: FailureMode) -> Self {
        Self {
            mode,
            attempts: Arc::new(AtomicU32::new(0)),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of calls, failed ones included
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Patches that landed, in order
    #[must_use]
    pub fn applied(&self) -> Vec<(String, Value)> {
        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockNodePatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl NodePatcher for MockNodePatcher {
    async fn patch_node(&self, name: &str, patch: &Value) -> Result<(), RoleError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);

        let fail = match self.mode {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::FirstN(n) => attempt < n,
        };
        if fail {
            return Err(RoleError::Rejected(format!(
                "mock failure for node {name} (attempt {})",
                attempt + 1
            )));
        }

        self.applied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), patch.clone()));
        Ok(())
    }
}
