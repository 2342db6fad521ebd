//! Subversion client

use std::path::Path;

use async_trait::async_trait;

use crate::errors::{DeployError, DeployResult};
use crate::vcs::command;

/// Output fragments svn prints for a revision outside the history
const UNKNOWN_REVISION_SIGNALS: [&str; 3] = ["No such revision", "E160006", "Syntax error in revision"];

pub fn is_unknown_revision(output: &str) -> bool {
    UNKNOWN_REVISION_SIGNALS.iter().any(|signal| output.contains(signal))
}

/// Operations on a subversion working copy
#[async_trait]
pub trait SubversionClient: Send + Sync {
    /// Fresh working copy of `location` at `dir`
    async fn checkout(&self, location: &str, dir: &Path) -> DeployResult<()>;

    /// Update the working copy at `dir` to `revision`
    async fn update(&self, dir: &Path, revision: &str) -> DeployResult<()>;

    /// Revision the working copy is at
    async fn current_revision(&self, dir: &Path) -> DeployResult<String>;
}

/// [`SubversionClient`] backed by the `svn` binary
#[derive(Debug, Default)]
pub struct SubversionCli;

#[async_trait]
impl SubversionClient for SubversionCli {
    async fn checkout(&self, location: &str, dir: &Path) -> DeployResult<()> {
        if let Some(parent) = dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let target = dir.to_string_lossy();
        command::run("svn", &["checkout", "--non-interactive", location, &target], None, None)
            .await?;
        Ok(())
    }

    async fn update(&self, dir: &Path, revision: &str) -> DeployResult<()> {
        if revision.starts_with('-') {
            return Err(DeployError::CommandFailure(format!(
                "svn: E205000: Syntax error in revision argument '{}'",
                revision
            )));
        }
        command::run("svn", &["update", "--non-interactive", "-r", revision], Some(dir), None)
            .await?;
        Ok(())
    }

    async fn current_revision(&self, dir: &Path) -> DeployResult<String> {
        let output =
            command::run("svn", &["info", "--show-item", "revision"], Some(dir), None).await?;
        Ok(output.trim().to_string())
    }
}
