//! Cluster apply client

pub mod kubectl;

use async_trait::async_trait;

use crate::errors::DeployResult;

pub use kubectl::KubectlClient;

/// Applies and deletes manifests given as YAML
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn apply(&self, manifest: &str) -> DeployResult<String>;

    /// Delete the resource; a resource that does not exist is not an error
    async fn delete(&self, manifest: &str) -> DeployResult<String>;
}
