//! Reconciliation logic for node role markers.
//!
//! Given a node's current labels, decides whether a role marker must be added
//! and, in replace mode, which stale markers must go. The decision is pure:
//! no I/O, no shared state, deterministic for the same inputs.

use crate::error::RoleError;
use crate::labels::{Mutation, is_role_marker, marker_key};
use std::collections::BTreeMap;
use std::fmt;

/// Why a node needs no patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    /// The node does not carry the source label
    MissingSourceLabel,
    /// The source label is present but empty
    EmptyRoleValue,
    /// The node already carries the marker
    AlreadyConverged {
        /// The marker found on the node
        marker_key: String,
    },
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSourceLabel => write!(f, "source label missing"),
            Self::EmptyRoleValue => write!(f, "source label has an empty value"),
            Self::AlreadyConverged { marker_key } => {
                write!(f, "marker {marker_key} already present")
            }
        }
    }
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to write
    NoOp(NoOpReason),
    /// Labels to write
    Mutate(Mutation),
}

/// Decides the label mutation for one node.
///
/// 1. No `role_source_label` on the node: no-op.
/// 2. The marker `node-role.kubernetes.io/<value>` already exists: no-op.
/// 3. Otherwise set the marker, and with `replace` delete every other marker.
#[must_use]
pub fn decide(
    labels: &BTreeMap<String, String>,
    role_source_label: &str,
    replace: bool,
) -> Decision {
    let Some(role) = labels.get(role_source_label) else {
        return Decision::NoOp(NoOpReason::MissingSourceLabel);
    };

    if role.is_empty() {
        return Decision::NoOp(NoOpReason::EmptyRoleValue);
    }

    let key = marker_key(role);
    if labels.contains_key(&key) {
        return Decision::NoOp(NoOpReason::AlreadyConverged { marker_key: key });
    }

    let mut mutation = Mutation::set_marker(key).replacing(replace);
    if replace {
        for stale in labels.keys().filter(|k| is_role_marker(k)) {
            mutation.delete(stale.as_str());
        }
    }

    Decision::Mutate(mutation)
}

/// Reconciler bound to the controller's configuration.
#[derive(Debug, Clone)]
pub struct RoleReconciler {
    role_source_label: String,
    replace: bool,
}

impl RoleReconciler {
    /// Creates a reconciler for the given source label.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::InvalidConfig`] if the label is empty.
    pub fn new(role_source_label: impl Into<String>, replace: bool) -> Result<Self, RoleError> {
        let role_source_label = role_source_label.into();
        if role_source_label.trim().is_empty() {
            return Err(RoleError::InvalidConfig(
                "role source label must not be empty".to_string(),
            ));
        }
        Ok(Self {
            role_source_label,
            replace,
        })
    }

    /// The label key that carries the intended role.
    #[must_use]
    pub fn role_source_label(&self) -> &str {
        &self.role_source_label
    }

    /// Whether stale markers are removed.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    /// Decides the mutation for a node's labels.
    #[must_use]
    pub fn decide(&self, labels: &BTreeMap<String, String>) -> Decision {
        decide(labels, &self.role_source_label, self.replace)
    }
}
