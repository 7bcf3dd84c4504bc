//! Patch executor.
//!
//! Turns a [`Mutation`] into a merge patch and writes it through a
//! [`NodePatcher`], retrying with exponential backoff until the patch lands
//! or the [`RetryPolicy`] budget runs out. Failures are reported through the
//! returned [`PatchOutcome`], the [`PatchRecorder`] and the log; they are
//! never raised to the caller.

use crate::backoff::RetryPolicy;
use crate::error::RoleError;
use crate::labels::Mutation;
use crate::metrics::PatchRecorder;
use crate::patcher::NodePatcher;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, info};

/// Terminal state of one patch invocation.
#[derive(Debug)]
pub enum PatchOutcome {
    /// The patch landed
    Succeeded {
        /// Attempts made, the successful one included
        attempts: u32,
    },
    /// The retry budget ran out
    TimedOut {
        /// Attempts made
        attempts: u32,
        /// Error from the last attempt
        error: RoleError,
    },
}

impl PatchOutcome {
    /// Whether the patch landed
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Attempts made
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Applies mutations with bounded retry.
///
/// Holds no per-node state, so one executor is shared across all
/// concurrent reconciliations.
#[derive(Clone)]
pub struct PatchExecutor {
    policy: RetryPolicy,
    recorder: Arc<dyn PatchRecorder>,
}

impl fmt::Debug for PatchExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PatchExecutor {
    /// Creates an executor.
    pub fn new(policy: RetryPolicy, recorder: Arc<dyn PatchRecorder>) -> Self {
        Self { policy, recorder }
    }

    /// Applies `mutation` to `node_name` through `patcher`.
    ///
    /// Records exactly one success or one failure per call.
    pub async fn apply<P>(&self, patcher: &P, node_name: &str, mutation: &Mutation) -> PatchOutcome
    where
        P: NodePatcher + ?Sized,
    {
        let patch = mutation.to_merge_patch();

        match self.patch_with_retry(patcher, node_name, &patch).await {
            Ok(attempts) => {
                self.recorder.record_success();
                info!(
                    node = %node_name,
                    marker_key = %mutation.marker_key(),
                    replace = mutation.replace(),
                    removed = mutation.deleted_keys().count(),
                    attempts,
                    "Node role label patched successfully"
                );
                PatchOutcome::Succeeded { attempts }
            }
            Err((attempts, err)) => {
                self.recorder.record_failure();
                error!(
                    node = %node_name,
                    marker_key = %mutation.marker_key(),
                    replace = mutation.replace(),
                    attempts,
                    error = %err,
                    "Patch node failed after backoff"
                );
                PatchOutcome::TimedOut {
                    attempts,
                    error: err,
                }
            }
        }
    }

    async fn patch_with_retry<P>(
        &self,
        patcher: &P,
        node_name: &str,
        patch: &Value,
    ) -> Result<u32, (u32, RoleError)>
    where
        P: NodePatcher + ?Sized,
    {
        let deadline = Instant::now() + self.policy.max_elapsed;
        let mut backoff = self.policy.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;

            // Dropping the in-flight call on deadline cancels it.
            let err = match timeout_at(deadline, patcher.patch_node(node_name, patch)).await {
                Ok(Ok(())) => return Ok(attempts),
                Ok(Err(e)) => e,
                Err(_) => {
                    return Err((attempts, RoleError::DeadlineExceeded(self.policy.max_elapsed)));
                }
            };

            let delay = backoff.next_backoff();
            if Instant::now() + delay >= deadline {
                return Err((attempts, err));
            }

            debug!(
                node = %node_name,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Patch attempt failed, retrying"
            );
            sleep(delay).await;
        }
    }
}
