//! Deploy orchestrator
//!
//! A deploy resolves the requested version, loads the manifests of that
//! revision, tears down a stale canary (stable deploys only) and applies the
//! rewritten manifests one by one. Per-resource failures are collected and
//! reported together once every resource has been attempted.

use std::sync::Arc;

use tracing::{error, info};

use crate::cluster::ClusterClient;
use crate::errors::{DeployError, DeployResult};
use crate::events::{Event, EventLog};
use crate::manifests::{load_manifests, transform};
use crate::models::image::ImageReference;
use crate::models::manifest::ManifestDocument;
use crate::models::repository::RepositoryConfig;
use crate::models::request::DeployRequest;
use crate::models::version::{commit_from_tag, ResolvedVersion};
use crate::tags::TagResolver;
use crate::vcs::VersionControl;

/// Branch whose manifests name the images listed by [`Deployer::list_tags`]
const DEFAULT_BRANCH: &str = "master";

/// Deploys configured repositories to the cluster
pub struct Deployer {
    repositories: Vec<RepositoryConfig>,
    vcs: Arc<VersionControl>,
    tags: TagResolver,
    cluster: Arc<dyn ClusterClient>,
    events: Arc<EventLog>,
}

impl Deployer {
    pub fn new(
        repositories: Vec<RepositoryConfig>,
        vcs: Arc<VersionControl>,
        tags: TagResolver,
        cluster: Arc<dyn ClusterClient>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            repositories,
            vcs,
            tags,
            cluster,
            events,
        }
    }

    pub fn repositories(&self) -> &[RepositoryConfig] {
        &self.repositories
    }

    pub fn repository(&self, name: &str) -> DeployResult<&RepositoryConfig> {
        self.repositories
            .iter()
            .find(|repository| repository.name == name)
            .ok_or_else(|| DeployError::RepositoryNotFound(name.to_string()))
    }

    /// Deploy `request`, returning the success message
    pub async fn deploy(&self, request: &DeployRequest) -> DeployResult<String> {
        let repository = self.repository(&request.repository)?;
        let request_id = request.request_id.as_deref();

        let commit = self.commit_to_deploy(repository, request).await?;
        self.events.log_opt(request_id, Event::pair("commit", &commit));

        let manifests = self.load(repository, &commit, request_id).await?;

        let tag = self
            .tag_to_deploy(repository, request, &commit, &manifests)
            .await?;
        self.events.log_opt(request_id, Event::pair("tag", &tag));

        let version =
            ResolvedVersion::new(commit, tag).ok_or_else(|| DeployError::IncompleteVersion {
                repository: repository.name.clone(),
            })?;

        if manifests.is_empty() {
            return Err(DeployError::NoResourcesFound {
                repository: repository.name.clone(),
                tag: version.tag,
            });
        }

        if !request.canary {
            let errors = self.delete_canaries(&manifests, &version.tag).await?;
            if !errors.is_empty() {
                return Err(DeployError::ResourceFailures(errors));
            }
        }

        let errors = self.apply(&manifests, &version.tag, request.canary).await?;
        if !errors.is_empty() {
            return Err(DeployError::ResourceFailures(errors));
        }

        let message = format!(
            "{} {} is deployed{}",
            repository.name,
            version.tag,
            if request.canary { " as canary" } else { "" }
        );
        info!("{}", message);
        Ok(message)
    }

    /// Tags of the images named by the default branch's manifests
    pub async fn list_tags(&self, name: &str) -> DeployResult<Vec<String>> {
        let repository = self.repository(name)?;
        let commit = self.vcs.resolve_commit(repository, DEFAULT_BRANCH, None).await?;
        let manifests = self.load(repository, &commit, None).await?;
        self.tags.list_tags(&images_of(&manifests)).await
    }

    async fn commit_to_deploy(
        &self,
        repository: &RepositoryConfig,
        request: &DeployRequest,
    ) -> DeployResult<String> {
        match (&request.commit, &request.tag) {
            (None, None) => Err(DeployError::MissingVersion),
            (Some(commit), _) => {
                self.vcs
                    .resolve_commit(repository, commit, request.request_id.as_deref())
                    .await
            }
            (None, Some(tag)) => {
                commit_from_tag(tag).ok_or_else(|| DeployError::IncompleteVersion {
                    repository: repository.name.clone(),
                })
            }
        }
    }

    async fn tag_to_deploy(
        &self,
        repository: &RepositoryConfig,
        request: &DeployRequest,
        commit: &str,
        manifests: &[ManifestDocument],
    ) -> DeployResult<String> {
        if let Some(tag) = &request.tag {
            return Ok(tag.clone());
        }
        self.tags
            .resolve_tag(&images_of(manifests), commit)
            .await?
            .ok_or_else(|| DeployError::IncompleteVersion {
                repository: repository.name.clone(),
            })
    }

    async fn load(
        &self,
        repository: &RepositoryConfig,
        commit: &str,
        request_id: Option<&str>,
    ) -> DeployResult<Vec<ManifestDocument>> {
        let manifest_directory = repository.manifest_directory.clone();
        self.vcs
            .with_checkout(repository, commit, request_id, |dir| async move {
                load_manifests(&dir, &manifest_directory).await
            })
            .await
    }

    /// Delete the canary variant of every Deployment
    async fn delete_canaries(
        &self,
        manifests: &[ManifestDocument],
        tag: &str,
    ) -> DeployResult<Vec<String>> {
        let mut errors = Vec::new();
        for document in manifests.iter().filter(|d| d.is_deployment()) {
            let canary = transform(document, tag, true);
            info!("deleting canary {}", canary.name().unwrap_or_default());
            if let Err(e) = self.cluster.delete(&canary.to_yaml()?).await {
                error!("deleting canary {} failed: {}", canary.name().unwrap_or_default(), e);
                errors.push(e.to_string());
            }
        }
        Ok(errors)
    }

    /// Apply every resource, or only the Deployments of a canary
    async fn apply(
        &self,
        manifests: &[ManifestDocument],
        tag: &str,
        canary: bool,
    ) -> DeployResult<Vec<String>> {
        let mut errors = Vec::new();
        for document in manifests.iter().filter(|d| !canary || d.is_deployment()) {
            let resource = transform(document, tag, canary);
            info!(
                "applying {} {}",
                resource.kind(),
                resource.name().unwrap_or_default()
            );
            if let Err(e) = self.cluster.apply(&resource.to_yaml()?).await {
                error!(
                    "applying {} {} failed: {}",
                    resource.kind(),
                    resource.name().unwrap_or_default(),
                    e
                );
                errors.push(e.to_string());
            }
        }
        Ok(errors)
    }
}

fn images_of(manifests: &[ManifestDocument]) -> Vec<ImageReference> {
    manifests.iter().flat_map(ManifestDocument::images).collect()
}
