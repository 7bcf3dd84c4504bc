//! Controller-specific error types.
//!
//! This module defines error types specific to the Node Role Controller
//! that are not covered by upstream library errors.

use kube::Error as KubeError;
use node_role_core::RoleError;
use thiserror::Error;

/// Errors that can occur in the Node Role Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Role reconciliation setup error
    #[error("Node role error: {0}")]
    Role(#[from] RoleError),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
