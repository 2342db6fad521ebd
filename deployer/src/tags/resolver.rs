//! Finds the registry tag that embeds a commit

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::errors::{DeployError, DeployResult};
use crate::models::image::ImageReference;
use crate::registry::Registries;
use crate::utils::{calc_square_backoff, BackoffOptions};

/// Resolves commits to tags by polling the image registries
#[derive(Clone)]
pub struct TagResolver {
    registries: Registries,
    backoff: BackoffOptions,
}

impl TagResolver {
    pub fn new(registries: Registries, backoff: BackoffOptions) -> Self {
        Self {
            registries,
            backoff,
        }
    }

    /// Tag containing `commit`, agreed on by every unpinned image.
    ///
    /// Returns `Ok(None)` when no image is left to ask or when the registries
    /// never list a matching tag. Images that disagree yield
    /// [`DeployError::AmbiguousTagResolution`].
    pub async fn resolve_tag(
        &self,
        images: &[ImageReference],
        commit: &str,
    ) -> DeployResult<Option<String>> {
        let candidates: BTreeSet<&str> = images
            .iter()
            .filter(|image| !image.has_explicit_tag())
            .map(|image| image.repository.as_str())
            .collect();
        if candidates.is_empty() {
            debug!("no unpinned images to resolve commit {} against", commit);
            return Ok(None);
        }

        let mut found: BTreeSet<Option<String>> = BTreeSet::new();
        for repository in candidates {
            let image = ImageReference {
                repository: repository.to_string(),
                tag: None,
            };
            found.insert(self.find_with_retry(&image, commit).await?);
        }

        if found.len() == 1 {
            return Ok(found.into_iter().next().flatten());
        }

        Err(DeployError::AmbiguousTagResolution {
            commit: commit.to_string(),
            tags: found
                .into_iter()
                .map(|tag| tag.unwrap_or_else(|| "<none>".to_string()))
                .collect(),
        })
    }

    /// Every tag known for the given images, sorted and deduplicated
    pub async fn list_tags(&self, images: &[ImageReference]) -> DeployResult<Vec<String>> {
        let repositories: BTreeSet<&str> =
            images.iter().map(|image| image.repository.as_str()).collect();

        let mut tags = BTreeSet::new();
        for repository in repositories {
            let image = ImageReference {
                repository: repository.to_string(),
                tag: None,
            };
            tags.extend(self.registries.tags(&image).await?);
        }
        Ok(tags.into_iter().collect())
    }

    /// Poll one image until a tag containing `commit` shows up.
    ///
    /// Sleeps `n² * base_delay` after failed attempt `n`, except after the
    /// last one. A registry error on the final attempt is returned.
    async fn find_with_retry(
        &self,
        image: &ImageReference,
        commit: &str,
    ) -> DeployResult<Option<String>> {
        let max_attempts = self.backoff.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.registries.tags(image).await {
                Ok(tags) => {
                    if let Some(tag) = tags.into_iter().find(|tag| tag.contains(commit)) {
                        info!("found tag {} for {} at commit {}", tag, image, commit);
                        return Ok(Some(tag));
                    }
                    debug!(
                        "no tag for {} at commit {} yet (attempt {}/{})",
                        image, commit, attempt, max_attempts
                    );
                }
                Err(e) if attempt < max_attempts => {
                    warn!(
                        "listing tags of {} failed (attempt {}/{}): {}",
                        image, attempt, max_attempts, e
                    );
                }
                Err(e) => return Err(e),
            }

            if attempt < max_attempts {
                tokio::time::sleep(calc_square_backoff(&self.backoff, attempt)).await;
            }
        }

        warn!(
            "gave up looking for a tag of {} at commit {} after {} attempts",
            image, commit, max_attempts
        );
        Ok(None)
    }
}
