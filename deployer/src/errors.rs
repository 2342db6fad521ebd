//! Error types for the deployer

use thiserror::Error;

/// Result alias used across the crate
pub type DeployResult<T> = Result<T, DeployError>;

/// Main error type for the deployer
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("commit or tag must be given")]
    MissingVersion,

    #[error("cannot determine the tag for repo {repository}")]
    IncompleteVersion { repository: String },

    #[error("revision {commit} does not exist in repository {repository}")]
    RevisionNotFound { repository: String, commit: String },

    #[error("no resources found for repo {repository} and tag {tag}")]
    NoResourcesFound { repository: String, tag: String },

    #[error("images disagree on the tag for commit {commit}: {}", .tags.join(", "))]
    AmbiguousTagResolution { commit: String, tags: Vec<String> },

    /// Per-resource apply or delete failures, in processing order
    #[error("{}", .0.join("\n"))]
    ResourceFailures(Vec<String>),

    #[error("{0}")]
    CommandFailure(String),

    #[error("repository {0} not found")]
    RepositoryNotFound(String),

    #[error("deploy timed out after {0}s")]
    Timeout(u64),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Short machine-readable name, recorded in event timelines
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::MissingVersion => "MissingVersion",
            DeployError::IncompleteVersion { .. } => "IncompleteVersion",
            DeployError::RevisionNotFound { .. } => "RevisionNotFound",
            DeployError::NoResourcesFound { .. } => "NoResourcesFound",
            DeployError::AmbiguousTagResolution { .. } => "AmbiguousTagResolution",
            DeployError::ResourceFailures(_) => "ResourceFailures",
            DeployError::CommandFailure(_) => "CommandFailure",
            DeployError::RepositoryNotFound(_) => "RepositoryNotFound",
            DeployError::Timeout(_) => "Timeout",
            DeployError::Registry(_) => "Registry",
            DeployError::Io(_) => "Io",
            DeployError::Json(_) => "Json",
            DeployError::Yaml(_) => "Yaml",
            DeployError::Http(_) => "Http",
            DeployError::Config(_) => "Config",
            DeployError::Server(_) => "Server",
            DeployError::Internal(_) => "Internal",
        }
    }

    /// Whether the error means the requested resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, DeployError::RepositoryNotFound(_))
    }
}

impl From<anyhow::Error> for DeployError {
    fn from(err: anyhow::Error) -> Self {
        DeployError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_failures_join_with_newlines() {
        let err = DeployError::ResourceFailures(vec![
            "deployment failed".to_string(),
            "service failed".to_string(),
        ]);
        assert_eq!(err.to_string(), "deployment failed\nservice failed");
    }

    #[test]
    fn test_incomplete_version_message() {
        let err = DeployError::IncompleteVersion {
            repository: "myapp".to_string(),
        };
        assert_eq!(err.to_string(), "cannot determine the tag for repo myapp");
        assert_eq!(err.kind(), "IncompleteVersion");
    }
}
