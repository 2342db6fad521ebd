//! Container registry clients

pub mod docker;
pub mod quay;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::DeployResult;
use crate::models::image::ImageReference;

pub use docker::DockerRegistryClient;
pub use quay::QuayRegistryClient;

/// Host prefix of images served by Quay
pub const QUAY_PREFIX: &str = "quay.io/";

/// Host prefix stripped before querying the default registry
const DOCKER_HUB_PREFIX: &str = "docker.io/";

/// Lists the tags of an image.
///
/// Paged registries are exhausted internally; callers get every tag.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn tags(&self, image_name: &str) -> DeployResult<Vec<String>>;
}

/// Picks the registry client for an image by its host prefix
#[derive(Clone)]
pub struct Registries {
    default: Arc<dyn RegistryClient>,
    quay: Arc<dyn RegistryClient>,
}

impl Registries {
    pub fn new(default: Arc<dyn RegistryClient>, quay: Arc<dyn RegistryClient>) -> Self {
        Self { default, quay }
    }

    /// Client and registry-local image name for `image`
    pub fn client_for(&self, image: &ImageReference) -> (Arc<dyn RegistryClient>, String) {
        let repository = image.repository.as_str();
        if let Some(name) = repository.strip_prefix(QUAY_PREFIX) {
            (self.quay.clone(), name.to_string())
        } else {
            let name = repository.strip_prefix(DOCKER_HUB_PREFIX).unwrap_or(repository);
            (self.default.clone(), name.to_string())
        }
    }

    /// Tag names of `image`
    pub async fn tags(&self, image: &ImageReference) -> DeployResult<Vec<String>> {
        let (client, name) = self.client_for(image);
        tracing::debug!("get {} tags from registry", name);
        client.tags(&name).await
    }
}
