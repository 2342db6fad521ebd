//! Scoped checkouts
//!
//! [`VersionControl::with_checkout`] brings a repository's working copy to a
//! revision, runs a body against it and, for git, puts the previous ref back
//! afterwards whether or not the body succeeded. If the caller drops the
//! checkout future midway, the restore is finished on a spawned task that
//! keeps holding the working copy lock. Checkouts sharing a working copy are
//! serialized on that lock.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::errors::{DeployError, DeployResult};
use crate::events::{Event, EventLog};
use crate::filesys::dir::Dir;
use crate::models::repository::{RepositoryConfig, SourceLocation};
use crate::models::version::is_symbolic_head;
use crate::storage::layout::StagingLayout;
use crate::vcs::git::{is_unknown_ref, GitClient};
use crate::vcs::subversion::{is_unknown_revision, SubversionClient};

/// Version control adapter over the git and subversion backends
pub struct VersionControl {
    layout: StagingLayout,
    git: Arc<dyn GitClient>,
    svn: Arc<dyn SubversionClient>,
    events: Arc<EventLog>,
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

/// Puts a git working copy back on `previous` if dropped while armed
struct RestoreGuard {
    git: Arc<dyn GitClient>,
    dir: PathBuf,
    previous: String,
    lock: Option<OwnedMutexGuard<()>>,
}

impl RestoreGuard {
    /// Release the working copy without restoring
    fn disarm(mut self) {
        self.lock.take();
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to restore {} in {:?}", self.previous, self.dir);
            return;
        };
        let git = self.git.clone();
        let dir = std::mem::take(&mut self.dir);
        let previous = std::mem::take(&mut self.previous);
        runtime.spawn(async move {
            debug!("restoring {} in {:?} after cancellation", previous, dir);
            if let Err(e) = git.switch_to(&dir, &previous).await {
                warn!("Failed to restore {} in {:?}: {}", previous, dir, e);
            }
            drop(lock);
        });
    }
}

impl VersionControl {
    pub fn new(
        layout: StagingLayout,
        git: Arc<dyn GitClient>,
        svn: Arc<dyn SubversionClient>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            layout,
            git,
            svn,
            events,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Lock guarding the working copy at `dir`
    fn lock_for(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(dir.to_path_buf()).or_default().clone()
    }

    /// Run `body` in the working copy of `repository` checked out at `commit`
    pub async fn with_checkout<T, F, Fut>(
        &self,
        repository: &RepositoryConfig,
        commit: &str,
        request_id: Option<&str>,
        body: F,
    ) -> DeployResult<T>
    where
        F: FnOnce(PathBuf) -> Fut + Send,
        Fut: Future<Output = DeployResult<T>> + Send,
        T: Send,
    {
        match &repository.source {
            SourceLocation::Distributed(location) => {
                self.git_checkout(repository, location, commit, request_id, body).await
            }
            SourceLocation::Centralized(location) => {
                self.svn_checkout(repository, location, commit, body).await
            }
        }
    }

    async fn git_checkout<T, F, Fut>(
        &self,
        repository: &RepositoryConfig,
        location: &str,
        commit: &str,
        request_id: Option<&str>,
        body: F,
    ) -> DeployResult<T>
    where
        F: FnOnce(PathBuf) -> Fut + Send,
        Fut: Future<Output = DeployResult<T>> + Send,
        T: Send,
    {
        let dir = self.layout.checkout_dir(repository).to_path_buf();
        let guard = self.lock_for(&dir).lock_owned().await;

        self.git.fetch_or_clone(location, &dir).await?;
        let previous = self.git.current_ref(&dir).await?;
        let restore = RestoreGuard {
            git: self.git.clone(),
            dir: dir.clone(),
            previous: previous.clone(),
            lock: Some(guard),
        };

        debug!("{}: switching {} -> {}", repository.name, previous, commit);
        if let Err(e) = self.git.switch_to(&dir, commit).await {
            restore.disarm();
            return Err(not_found_or(e, repository, commit, is_unknown_ref));
        }

        if let Some(request_id) = request_id {
            self.record_commit_metadata(&dir, request_id).await;
        }

        let result = body(dir.clone()).await;

        debug!("{}: restoring {}", repository.name, previous);
        let restored = self.git.switch_to(&dir, &previous).await;
        restore.disarm();
        match (result, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), restored) => {
                if let Err(restore_error) = restored {
                    warn!(
                        "{}: failed to restore {}: {}",
                        repository.name, previous, restore_error
                    );
                }
                Err(e)
            }
        }
    }

    async fn svn_checkout<T, F, Fut>(
        &self,
        repository: &RepositoryConfig,
        location: &str,
        revision: &str,
        body: F,
    ) -> DeployResult<T>
    where
        F: FnOnce(PathBuf) -> Fut + Send,
        Fut: Future<Output = DeployResult<T>> + Send,
        T: Send,
    {
        let dir = self.layout.checkout_dir(repository).to_path_buf();
        let _guard = self.lock_for(&dir).lock_owned().await;

        if !Dir::new(dir.join(".svn")).exists().await {
            self.svn.checkout(location, &dir).await?;
        }
        self.svn
            .update(&dir, revision)
            .await
            .map_err(|e| not_found_or(e, repository, revision, is_unknown_revision))?;

        body(dir).await
    }

    /// Author and line counts of the checked out commit, for the audit trail
    async fn record_commit_metadata(&self, dir: &Path, request_id: &str) {
        match self.git.commit_author(dir).await {
            Ok(author) => self.events.log(request_id, Event::pair("author", author)),
            Err(e) => warn!("Unable to read commit author: {}", e),
        }
        match self.git.commit_stats(dir).await {
            Ok(stats) => {
                self.events.log(request_id, Event::pair("insertions", stats.insertions));
                self.events.log(request_id, Event::pair("deletions", stats.deletions));
            }
            Err(e) => warn!("Unable to read commit stats: {}", e),
        }
    }

    /// Resolve `reference` to a concrete revision.
    ///
    /// Symbolic heads (`master`, `HEAD`) are looked up live against the
    /// remote; anything else is returned unchanged.
    pub async fn resolve_commit(
        &self,
        repository: &RepositoryConfig,
        reference: &str,
        request_id: Option<&str>,
    ) -> DeployResult<String> {
        if !is_symbolic_head(reference) {
            return Ok(reference.to_string());
        }

        let commit = match &repository.source {
            SourceLocation::Distributed(_) => {
                let remote_ref = format!("origin/{}", reference);
                let git = self.git.clone();
                self.with_checkout(repository, &remote_ref, None, |dir| async move {
                    git.current_commit(&dir).await
                })
                .await?
            }
            SourceLocation::Centralized(_) => {
                let svn = self.svn.clone();
                self.with_checkout(repository, "HEAD", None, |dir| async move {
                    svn.current_revision(&dir).await
                })
                .await?
            }
        };

        info!("{}: {} is at {}", repository.name, reference, commit);
        self.events.log_opt(request_id, Event::pair("head", &commit));
        Ok(commit)
    }
}

fn not_found_or(
    error: DeployError,
    repository: &RepositoryConfig,
    commit: &str,
    is_not_found: fn(&str) -> bool,
) -> DeployError {
    match error {
        DeployError::CommandFailure(output) if is_not_found(&output) => {
            DeployError::RevisionNotFound {
                repository: repository.name.clone(),
                commit: commit.to_string(),
            }
        }
        other => other,
    }
}
