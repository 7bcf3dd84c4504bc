//! Node Role Core
//!
//! Reconciliation engine for node role markers.
//!
//! A node opts in by carrying a configurable "source" label, for example
//! `example.com/role=gpu`. The engine derives the canonical marker label
//! `node-role.kubernetes.io/gpu` from it and patches the node until the marker
//! is present.
//!
//! # Example
//!
//! ```no_run
//! use node_role_core::{Decision, RoleReconciler};
//! use std::collections::BTreeMap;
//!
//! # fn example() -> Result<(), node_role_core::RoleError> {
//! let reconciler = RoleReconciler::new("example.com/role", false)?;
//!
//! let mut labels = BTreeMap::new();
//! labels.insert("example.com/role".to_string(), "gpu".to_string());
//!
//! match reconciler.decide(&labels) {
//!     Decision::Mutate(mutation) => println!("patch: {}", mutation.to_merge_patch()),
//!     Decision::NoOp(reason) => println!("nothing to do: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - **Reconciler**: pure decision logic, see [`decide`]
//! - **Patch Executor**: retried merge-patch writes, see [`PatchExecutor`]
//! - **Metrics**: success/failure counters, see [`PatchMetrics`]

pub mod backoff;
pub mod error;
pub mod executor;
pub mod labels;
pub mod metrics;
pub mod patcher;
pub mod reconciler;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use backoff::{ExponentialBackoff, RetryPolicy};
pub use error::RoleError;
pub use executor::{PatchExecutor, PatchOutcome};
pub use labels::{LabelChange, Mutation, ROLE_MARKER_PREFIX};
pub use metrics::{PatchMetrics, PatchRecorder};
pub use patcher::{KubeNodePatcher, NodePatcher};
pub use reconciler::{decide, Decision, NoOpReason, RoleReconciler};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockNodePatcher;
