//! Scoped checkouts against a real git repository

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use deployer::errors::DeployError;
use deployer::events::EventLog;
use deployer::manifests::load_manifests;
use deployer::models::repository::{RepositoryConfig, SourceLocation};
use deployer::storage::layout::StagingLayout;
use deployer::vcs::{GitCli, SubversionCli, VersionControl};

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.email=test@example.com", "-c", "user.name=tester"])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed: {:?}", args, output);
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// An origin repository with two commits touching `kubernetes/`
fn origin(dir: &Path) -> (String, String) {
    std::fs::create_dir_all(dir.join("kubernetes")).unwrap();
    git(dir, &["init", "--quiet", "-b", "master"]);

    std::fs::write(dir.join("kubernetes/web.yml"), "kind: Deployment\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", "deployment"]);
    let first = git(dir, &["rev-parse", "HEAD"]);

    std::fs::write(
        dir.join("kubernetes/service.yml"),
        "kind: Service\nmetadata:\n  name: web\n",
    )
    .unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "--quiet", "-m", "service"]);
    let second = git(dir, &["rev-parse", "HEAD"]);

    (first, second)
}

fn version_control(staging: &Path, events: Arc<EventLog>) -> VersionControl {
    VersionControl::new(
        StagingLayout::new(staging),
        Arc::new(GitCli::new(None, None)),
        Arc::new(SubversionCli::default()),
        events,
    )
}

#[tokio::test]
async fn test_checkout_old_commit_and_restore() {
    if !git_available() {
        return;
    }
    let origin_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let (first, second) = origin(origin_dir.path());

    let events = Arc::new(EventLog::new());
    let vcs = version_control(staging.path(), events.clone());
    let repository = RepositoryConfig::new(
        "myapp",
        SourceLocation::Distributed(origin_dir.path().to_string_lossy().into_owned()),
    );

    let kinds = vcs
        .with_checkout(&repository, &first, Some("req-1"), |dir| async move {
            let documents = load_manifests(&dir, "kubernetes").await?;
            Ok(documents
                .iter()
                .map(|d| d.kind().to_string())
                .collect::<Vec<_>>())
        })
        .await
        .unwrap();
    assert_eq!(kinds, vec!["Deployment"]);

    let timeline = events.flush("req-1").unwrap();
    assert_eq!(timeline.value_of("author"), Some("tester"));
    assert_eq!(timeline.value_of("insertions"), Some("1"));

    let checkout = staging.path().join("git").join(
        origin_dir
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .as_ref(),
    );
    assert_eq!(git(&checkout, &["rev-parse", "--abbrev-ref", "HEAD"]), "master");

    let head = vcs
        .resolve_commit(&repository, "master", None)
        .await
        .unwrap();
    assert_eq!(head, second);
}

#[tokio::test]
async fn test_unknown_commit_is_revision_not_found() {
    if !git_available() {
        return;
    }
    let origin_dir = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    origin(origin_dir.path());

    let vcs = version_control(staging.path(), Arc::new(EventLog::new()));
    let repository = RepositoryConfig::new(
        "myapp",
        SourceLocation::Distributed(origin_dir.path().to_string_lossy().into_owned()),
    );

    let missing = "0123456789012345678901234567890123456789";
    let err = vcs
        .with_checkout(&repository, missing, None, |_dir| async { Ok(()) })
        .await
        .unwrap_err();
    match err {
        DeployError::RevisionNotFound { repository, commit } => {
            assert_eq!(repository, "myapp");
            assert_eq!(commit, missing);
        }
        other => panic!("unexpected error: {}", other),
    }
}
