//! Node event handling.
//!
//! Bridges node snapshots delivered by the watcher to the role reconciler
//! and the patch executor.

use k8s_openapi::api::core::v1::Node;
use node_role_core::{Decision, NodePatcher, PatchExecutor, PatchOutcome, RoleReconciler};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Ensures each node carries the role marker named by its source label.
#[derive(Debug)]
pub struct NodeHandler<P> {
    reconciler: RoleReconciler,
    executor: PatchExecutor,
    patcher: P,
}

impl<P: NodePatcher> NodeHandler<P> {
    /// Creates a new handler.
    pub fn new(reconciler: RoleReconciler, executor: PatchExecutor, patcher: P) -> Self {
        Self {
            reconciler,
            executor,
            patcher,
        }
    }

    /// Checks the node's labels and patches it if its marker is missing.
    ///
    /// Returns the patch outcome, or `None` when nothing was written.
    pub async fn ensure_role(&self, node: &Node) -> Option<PatchOutcome> {
        let Some(name) = node.metadata.name.as_deref().filter(|n| !n.is_empty()) else {
            warn!("Received node event without a name, dropping");
            return None;
        };

        debug!(
            node = %name,
            label = %self.reconciler.role_source_label(),
            replace = self.reconciler.replace(),
            "Processing role for node"
        );

        let empty = BTreeMap::new();
        let labels = node.metadata.labels.as_ref().unwrap_or(&empty);

        match self.reconciler.decide(labels) {
            Decision::NoOp(reason) => {
                debug!(node = %name, %reason, "No role patch needed");
                None
            }
            Decision::Mutate(mutation) => {
                for key in mutation.deleted_keys() {
                    debug!(node = %name, role_key = %key, "Removing stale role label");
                }
                Some(self.executor.apply(&self.patcher, name, &mutation).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use node_role_core::{MockNodePatcher, PatchMetrics, RetryPolicy};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const SOURCE: &str = "test-label";

    fn test_node(name: Option<&str>, labels: &[(&str, &str)]) -> Node {
        Node {
            metadata: ObjectMeta {
                name: name.map(str::to_string),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn handler(
        replace: bool,
        patcher: MockNodePatcher,
    ) -> (NodeHandler<MockNodePatcher>, Arc<PatchMetrics>) {
        let metrics = Arc::new(PatchMetrics::new().unwrap());
        let executor = PatchExecutor::new(
            RetryPolicy::default().with_max_elapsed(Duration::from_secs(2)),
            metrics.clone(),
        );
        let reconciler = RoleReconciler::new(SOURCE, replace).unwrap();
        (NodeHandler::new(reconciler, executor, patcher), metrics)
    }

    #[tokio::test]
    async fn test_node_without_name_is_dropped() {
        let patcher = MockNodePatcher::new();
        let (handler, metrics) = handler(false, patcher.clone());

        let outcome = handler.ensure_role(&test_node(None, &[(SOURCE, "worker")])).await;
        assert!(outcome.is_none());

        let outcome = handler.ensure_role(&test_node(Some(""), &[(SOURCE, "worker")])).await;
        assert!(outcome.is_none());

        assert_eq!(patcher.attempts(), 0);
        assert_eq!(metrics.success_total() + metrics.failure_total(), 0);
    }

    #[tokio::test]
    async fn test_node_without_labels_is_skipped() {
        let patcher = MockNodePatcher::new();
        let (handler, _) = handler(false, patcher.clone());

        let mut node = test_node(Some("n1"), &[]);
        node.metadata.labels = None;

        assert!(handler.ensure_role(&node).await.is_none());
        assert_eq!(patcher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_node_with_role_label_is_skipped() {
        let patcher = MockNodePatcher::new();
        let (handler, _) = handler(true, patcher.clone());

        let node = test_node(
            Some("n2"),
            &[(SOURCE, "worker"), ("node-role.kubernetes.io/worker", "")],
        );

        assert!(handler.ensure_role(&node).await.is_none());
        assert_eq!(patcher.attempts(), 0);
    }

    #[tokio::test]
    async fn test_patch_success_without_replace() {
        let patcher = MockNodePatcher::new();
        let (handler, metrics) = handler(false, patcher.clone());

        let node = test_node(
            Some("n3"),
            &[(SOURCE, "worker"), ("node-role.kubernetes.io/other", "")],
        );
        let outcome = handler.ensure_role(&node).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(metrics.success_total(), 1);
        assert_eq!(
            patcher.applied(),
            vec![(
                "n3".to_string(),
                json!({"metadata": {"labels": {"node-role.kubernetes.io/worker": ""}}})
            )]
        );
    }

    #[tokio::test]
    async fn test_patch_success_with_replace() {
        let patcher = MockNodePatcher::new();
        let (handler, metrics) = handler(true, patcher.clone());

        let node = test_node(
            Some("n4"),
            &[
                (SOURCE, "worker"),
                ("node-role.kubernetes.io/old1", ""),
                ("node-role.kubernetes.io/old2", ""),
            ],
        );
        let outcome = handler.ensure_role(&node).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(metrics.success_total(), 1);
        let applied = patcher.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].1,
            json!({"metadata": {"labels": {
                "node-role.kubernetes.io/worker": "",
                "node-role.kubernetes.io/old1": null,
                "node-role.kubernetes.io/old2": null,
            }}})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_failure_is_reported_not_raised() {
        let patcher = MockNodePatcher::failing();
        let (handler, metrics) = handler(false, patcher.clone());

        let node = test_node(Some("n5"), &[(SOURCE, "worker")]);
        let outcome = handler.ensure_role(&node).await.unwrap();

        assert!(!outcome.is_success());
        assert!(patcher.attempts() > 1);
        assert_eq!(metrics.failure_total(), 1);
        assert_eq!(metrics.success_total(), 0);
    }

    #[tokio::test]
    async fn test_repeated_events_after_convergence_are_noops() {
        let patcher = MockNodePatcher::new();
        let (handler, metrics) = handler(false, patcher.clone());

        let before = test_node(Some("n6"), &[(SOURCE, "db")]);
        assert!(handler.ensure_role(&before).await.unwrap().is_success());

        let after = test_node(
            Some("n6"),
            &[(SOURCE, "db"), ("node-role.kubernetes.io/db", "")],
        );
        for _ in 0..3 {
            assert!(handler.ensure_role(&after).await.is_none());
        }

        assert_eq!(patcher.attempts(), 1);
        assert_eq!(metrics.success_total(), 1);
    }
}
