//! Repository configuration

use serde::{Deserialize, Serialize};

use crate::errors::DeployError;

/// Manifest directory used when a repository does not name one
pub const DEFAULT_MANIFEST_DIRECTORY: &str = "kubernetes";

/// A repository entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,

    /// `owner/name` on GitHub (or the configured git host)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,

    /// Subversion repository URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subversion: Option<String>,

    /// Manifest directory inside the repository
    #[serde(default)]
    pub kube_resource: Option<String>,
}

/// Where a repository's source lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Git repository, as `owner/name`
    Distributed(String),
    /// Subversion repository URL
    Centralized(String),
}

impl SourceLocation {
    /// The configured address, whichever backend it belongs to
    pub fn address(&self) -> &str {
        match self {
            SourceLocation::Distributed(location) | SourceLocation::Centralized(location) => {
                location
            }
        }
    }
}

/// A validated, deployable repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub name: String,
    pub source: SourceLocation,
    pub manifest_directory: String,
}

impl RepositoryConfig {
    pub fn new(name: impl Into<String>, source: SourceLocation) -> Self {
        Self {
            name: name.into(),
            source,
            manifest_directory: DEFAULT_MANIFEST_DIRECTORY.to_string(),
        }
    }

    pub fn with_manifest_directory(mut self, directory: impl Into<String>) -> Self {
        self.manifest_directory = directory.into();
        self
    }
}

/// Whether `name` can key a working copy directory and a URL path segment
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl TryFrom<RepositoryEntry> for RepositoryConfig {
    type Error = DeployError;

    fn try_from(entry: RepositoryEntry) -> Result<Self, Self::Error> {
        if !is_valid_name(&entry.name) {
            return Err(DeployError::Config(format!(
                "Invalid repository name {:?}",
                entry.name
            )));
        }
        let source = match (entry.github, entry.subversion) {
            (Some(github), None) => SourceLocation::Distributed(github),
            (None, Some(subversion)) => SourceLocation::Centralized(subversion),
            (Some(_), Some(_)) => {
                return Err(DeployError::Config(format!(
                    "Define either subversion or github for {}, not both!",
                    entry.name
                )))
            }
            (None, None) => {
                return Err(DeployError::Config(format!(
                    "Define either subversion or github for {}!",
                    entry.name
                )))
            }
        };
        Ok(Self {
            name: entry.name,
            source,
            manifest_directory: entry
                .kube_resource
                .unwrap_or_else(|| DEFAULT_MANIFEST_DIRECTORY.to_string()),
        })
    }
}

impl From<&RepositoryConfig> for RepositoryEntry {
    fn from(config: &RepositoryConfig) -> Self {
        let (github, subversion) = match &config.source {
            SourceLocation::Distributed(location) => (Some(location.clone()), None),
            SourceLocation::Centralized(location) => (None, Some(location.clone())),
        };
        Self {
            name: config.name.clone(),
            github,
            subversion,
            kube_resource: Some(config.manifest_directory.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(github: Option<&str>, subversion: Option<&str>) -> RepositoryEntry {
        RepositoryEntry {
            name: "myapp".to_string(),
            github: github.map(str::to_string),
            subversion: subversion.map(str::to_string),
            kube_resource: None,
        }
    }

    #[test]
    fn test_exactly_one_location() {
        assert!(RepositoryConfig::try_from(entry(Some("me/myapp"), None)).is_ok());
        assert!(RepositoryConfig::try_from(entry(None, Some("svn://host/myapp"))).is_ok());
        assert!(RepositoryConfig::try_from(entry(None, None)).is_err());
        assert!(RepositoryConfig::try_from(entry(Some("me/myapp"), Some("svn://x"))).is_err());
    }

    #[test]
    fn test_name_must_be_a_single_path_segment() {
        for name in ["", ".", "..", "me/myapp", "..\\up"] {
            let mut entry = entry(Some("me/myapp"), None);
            entry.name = name.to_string();
            assert!(RepositoryConfig::try_from(entry).is_err(), "{name:?}");
        }
        assert!(is_valid_name("myapp-staging"));
    }

    #[test]
    fn test_entry_serializes_only_set_location() {
        let config = RepositoryConfig::new("app", SourceLocation::Distributed("me/myapp".into()));
        let json = serde_json::to_value(RepositoryEntry::from(&config)).unwrap();
        assert_eq!(json["github"], "me/myapp");
        assert_eq!(json["kube_resource"], "kubernetes");
        assert!(json.get("subversion").is_none());
    }
}
