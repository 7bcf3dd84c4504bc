//! Role marker labels and the mutations computed against them.
//!
//! A [`Mutation`] is produced once per reconciliation pass and consumed once
//! by the patch executor. It serializes to a JSON merge patch where `""` sets
//! a presence-only label and `null` removes one.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Prefix under which canonical role markers are written.
pub const ROLE_MARKER_PREFIX: &str = "node-role.kubernetes.io/";

/// Returns the marker key for a role value.
#[must_use]
pub fn marker_key(role: &str) -> String {
    format!("{ROLE_MARKER_PREFIX}{role}")
}

/// Returns true if the label key is a role marker.
#[must_use]
pub fn is_role_marker(key: &str) -> bool {
    key.starts_with(ROLE_MARKER_PREFIX)
}

/// A single label edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelChange {
    /// Set the label to the empty string
    SetEmpty,
    /// Remove the label
    Delete,
}

/// Label edits for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    marker_key: String,
    replace: bool,
    changes: BTreeMap<String, LabelChange>,
}

impl Mutation {
    /// Creates a mutation that sets `marker_key`.
    #[must_use]
    pub fn set_marker(marker_key: impl Into<String>) -> Self {
        let marker_key = marker_key.into();
        let mut changes = BTreeMap::new();
        changes.insert(marker_key.clone(), LabelChange::SetEmpty);
        Self {
            marker_key,
            replace: false,
            changes,
        }
    }

    /// Marks the mutation as computed in replace mode.
    #[must_use]
    pub fn replacing(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Adds a removal for `key`. The target marker itself is never removed.
    pub fn delete(&mut self, key: impl Into<String>) {
        let key = key.into();
        if key != self.marker_key {
            self.changes.insert(key, LabelChange::Delete);
        }
    }

    /// The marker this mutation converges the node to.
    #[must_use]
    pub fn marker_key(&self) -> &str {
        &self.marker_key
    }

    /// Whether stale markers were scheduled for removal.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    /// All label edits, keyed by label.
    #[must_use]
    pub fn changes(&self) -> &BTreeMap<String, LabelChange> {
        &self.changes
    }

    /// Keys scheduled for removal.
    pub fn deleted_keys(&self) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(|(_, change)| **change == LabelChange::Delete)
            .map(|(key, _)| key.as_str())
    }

    /// Builds the merge patch body: `{"metadata":{"labels":{...}}}`.
    #[must_use]
    pub fn to_merge_patch(&self) -> Value {
        let labels: Map<String, Value> = self
            .changes
            .iter()
            .map(|(key, change)| {
                let value = match change {
                    LabelChange::SetEmpty => Value::String(String::new()),
                    LabelChange::Delete => Value::Null,
                };
                (key.clone(), value)
            })
            .collect();

        json!({ "metadata": { "labels": labels } })
    }
}
