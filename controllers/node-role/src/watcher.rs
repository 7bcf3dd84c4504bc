//! Kubernetes node watcher.
//!
//! Drives [`NodeHandler::ensure_role`] from a `kube_runtime::Controller`
//! over all nodes. The controller runs distinct nodes concurrently and never
//! runs the same node twice at once.

use crate::error::ControllerError;
use crate::handler::NodeHandler;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::Api;
use kube_runtime::{
    Controller,
    controller::{Action, Config as RuntimeConfig},
    watcher,
};
use node_role_core::NodePatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Every node is re-checked at least this often, even without events.
pub const RESYNC_PERIOD: Duration = Duration::from_secs(30);

/// Maximum nodes reconciled at the same time.
const CONCURRENCY: u16 = 16;

/// Watches nodes until SIGINT/SIGTERM.
///
/// Per-node failures are recorded by the handler and never stop the loop; a
/// dropped patch is retried on the next event or resync.
pub async fn watch_nodes<P>(
    api: Api<Node>,
    handler: Arc<NodeHandler<P>>,
) -> Result<(), ControllerError>
where
    P: NodePatcher + 'static,
{
    info!("Starting Node watcher");

    let error_policy = |node: Arc<Node>, error: &ControllerError, _ctx: Arc<NodeHandler<P>>| {
        error!(
            node = node.metadata.name.as_deref().unwrap_or("<unknown>"),
            error = %error,
            "Reconciliation error for Node"
        );
        Action::requeue(RESYNC_PERIOD)
    };

    let reconcile = |node: Arc<Node>, ctx: Arc<NodeHandler<P>>| async move {
        ctx.ensure_role(&node).await;
        Ok::<_, ControllerError>(Action::requeue(RESYNC_PERIOD))
    };

    // Short debounce folds bursts of heartbeat updates into one pass.
    let runtime_config = RuntimeConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(CONCURRENCY);

    Controller::new(api, watcher::Config::default())
        .with_config(runtime_config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, handler)
        .for_each(|res| async move {
            match res {
                Ok((node, _)) => debug!(node = %node.name, "Reconciled Node"),
                Err(e) => warn!(error = %e, "Node controller error"),
            }
        })
        .await;

    info!("Node watcher stopped");
    Ok(())
}
