//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the node watcher
//! and the metrics server together and owns their lifetimes.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::handler::NodeHandler;
use crate::server;
use crate::watcher::watch_nodes;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};
use node_role_core::{KubeNodePatcher, PatchExecutor, PatchMetrics, RetryPolicy, RoleReconciler};
use prometheus::Registry;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::info;

/// Main controller for node role markers.
#[derive(Debug)]
pub struct Controller {
    node_watcher: JoinHandle<Result<(), ControllerError>>,
    metrics_server: JoinHandle<Result<(), ControllerError>>,
    server_shutdown: oneshot::Sender<()>,
}

impl Controller {
    /// Creates a new controller instance and starts its background tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Node Role Controller");

        let reconciler = RoleReconciler::new(config.role_label.clone(), config.replace)?;

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(PatchMetrics::new_with_registry(Arc::clone(&registry))?);
        let executor = PatchExecutor::new(RetryPolicy::default(), metrics);

        let handler = Arc::new(NodeHandler::new(
            reconciler,
            executor,
            KubeNodePatcher::new(kube_client.clone()),
        ));
        let node_api: Api<Node> = Api::all(kube_client);

        let node_watcher = tokio::spawn(async move { watch_nodes(node_api, handler).await });

        let (server_shutdown, shutdown_rx) = oneshot::channel();
        let port = config.server_port;
        let metrics_server = tokio::spawn(async move {
            server::serve(port, registry, async {
                let _ = shutdown_rx.await;
            })
            .await
        });

        Ok(Self {
            node_watcher,
            metrics_server,
            server_shutdown,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// The watcher stops on SIGINT/SIGTERM; the metrics server then drains
    /// for at most [`server::SHUTDOWN_GRACE`]. A metrics server that exits
    /// on its own is an error.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Node Role Controller running");

        let Self {
            mut node_watcher,
            mut metrics_server,
            server_shutdown,
        } = self;

        tokio::select! {
            result = &mut node_watcher => {
                result.map_err(|e| {
                    ControllerError::Watch(format!("Node watcher panicked: {e}"))
                })??;
                info!("Shutting down metrics server");
                let _ = server_shutdown.send(());
                metrics_server.await.map_err(server_panicked)??;
            }
            result = &mut metrics_server => {
                node_watcher.abort();
                result.map_err(server_panicked)??;
                return Err(ControllerError::Server(
                    "metrics server exited unexpectedly".to_string(),
                ));
            }
        }

        info!("Node Role Controller stopped");
        Ok(())
    }
}

fn server_panicked(e: JoinError) -> ControllerError {
    ControllerError::Server(format!("Metrics server panicked: {e}"))
}
