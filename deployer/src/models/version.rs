//! Commit and tag handling

use serde::Serialize;

/// Refs that mean "whatever the branch head is right now"
const SYMBOLIC_HEADS: [&str; 2] = ["master", "HEAD"];

/// A concrete version to deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    /// Revision id; a 40-hex-character hash for git
    pub commit: String,
    /// Release tag, conventionally `<branch-or-label>-<commit>`
    pub tag: String,
}

impl ResolvedVersion {
    /// Pair a commit with a tag, rejecting tags that do not embed the commit
    pub fn new(commit: impl Into<String>, tag: impl Into<String>) -> Option<Self> {
        let commit = commit.into();
        let tag = tag.into();
        if commit.is_empty() || !tag.contains(&commit) {
            return None;
        }
        Some(Self { commit, tag })
    }
}

/// Extract the commit embedded in a `<label>-<commit>` tag
pub fn commit_from_tag(tag: &str) -> Option<String> {
    let (label, commit) = tag.rsplit_once('-')?;
    if label.is_empty() || commit.is_empty() {
        return None;
    }
    commit
        .chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| commit.to_string())
}

/// Whether `reference` names a moving branch head rather than a revision
pub fn is_symbolic_head(reference: &str) -> bool {
    SYMBOLIC_HEADS.contains(&reference)
}
