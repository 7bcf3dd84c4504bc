//! Node Role Controller
//!
//! Mirrors a configurable node label into the standard
//! `node-role.kubernetes.io/<role>` marker so `kubectl get nodes` shows
//! each node's role.
//!
//! This controller watches `Node` objects cluster-wide and patches the
//! marker onto any node whose source label names a role it does not yet
//! carry, optionally removing stale markers.

mod config;
mod controller;
mod error;
mod handler;
mod server;
mod watcher;

use config::ControllerConfig;
use controller::Controller;
use error::ControllerError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // kube's rustls client needs a process-wide provider; a second install is harmless
    let _ = rustls::crypto::ring::default_provider().install_default();

    // Load configuration from environment variables
    let config = ControllerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .init();

    info!("Starting Node Role Controller");
    info!("Configuration:");
    info!("  Role label: {}", config.role_label);
    info!("  Replace existing roles: {}", config.replace);
    info!("  Server port: {}", config.server_port);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
