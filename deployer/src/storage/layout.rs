//! Staging directory layout

use std::path::PathBuf;

use crate::errors::DeployResult;
use crate::filesys::dir::Dir;
use crate::models::repository::{RepositoryConfig, SourceLocation};

/// Where working copies live
#[derive(Debug, Clone)]
pub struct StagingLayout {
    /// Base directory for all working copies
    pub base_dir: PathBuf,
}

impl StagingLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Git working copies
    pub fn git_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("git"))
    }

    /// Subversion working copies
    pub fn svn_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("svn"))
    }

    /// Working copy of `repository`, reused across deploys. Keyed by the
    /// repository name, so entries sharing a source get separate copies.
    pub fn checkout_dir(&self, repository: &RepositoryConfig) -> Dir {
        let backend_dir = match repository.source {
            SourceLocation::Distributed(_) => self.git_dir(),
            SourceLocation::Centralized(_) => self.svn_dir(),
        };
        backend_dir.subdir(&repository.name)
    }

    /// Create the backend directories
    pub async fn setup(&self) -> DeployResult<()> {
        self.git_dir().create().await?;
        self.svn_dir().create().await?;
        Ok(())
    }
}

impl Default for StagingLayout {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("deployer"))
    }
}
