//! Node patch capability
//!
//! The executor writes through [`NodePatcher`] so it can be exercised without
//! a cluster. [`KubeNodePatcher`] is the real implementation.

use crate::error::RoleError;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use serde_json::Value;
use tracing::debug;

/// Applies a merge patch to a node.
///
/// Implementations are invoked concurrently for different nodes. Callers
/// bound each call with a deadline by dropping the returned future, so
/// implementations must be cancel-safe.
#[async_trait::async_trait]
pub trait NodePatcher: Send + Sync {
    /// Apply `patch` to the node named `name`.
    async fn patch_node(&self, name: &str, patch: &Value) -> Result<(), RoleError>;
}

/// Patches nodes through the Kubernetes API.
#[derive(Clone, Debug)]
pub struct KubeNodePatcher {
    api: Api<Node>,
    params: PatchParams,
}

impl KubeNodePatcher {
    /// Create a patcher for cluster-scoped nodes.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::from_api(Api::all(client))
    }

    /// Create a patcher over an existing node API handle.
    #[must_use]
    pub fn from_api(api: Api<Node>) -> Self {
        Self {
            api,
            params: PatchParams::default(),
        }
    }
}

#[async_trait::async_trait]
impl NodePatcher for KubeNodePatcher {
    async fn patch_node(&self, name: &str, patch: &Value) -> Result<(), RoleError> {
        debug!(node = %name, %patch, "Patching node labels");
        self.api
            .patch(name, &self.params, &Patch::Merge(patch))
            .await?;
        Ok(())
    }
}
