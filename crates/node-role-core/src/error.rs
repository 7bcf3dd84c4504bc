//! Node role errors

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reconciling node roles
#[derive(Debug, Error)]
pub enum RoleError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The patch capability refused the write
    #[error("Patch rejected: {0}")]
    Rejected(String),

    /// The overall patch deadline expired while an attempt was in flight
    #[error("Patch deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
