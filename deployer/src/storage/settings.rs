//! Settings loading
//!
//! Settings are layered: `config.yml`, then `config.override.yml`, then
//! `DEPLOYER_*` environment variables (`__` separates nested keys).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File as ConfigFile, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::{DeployError, DeployResult};
use crate::logs::LogLevel;
use crate::models::repository::{RepositoryConfig, RepositoryEntry};

/// Deployer settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON log lines on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Deployment environment name, e.g. `production`
    #[serde(default = "default_environment")]
    pub environment: String,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Basic auth password for the HTTP API (username `auth_token`)
    #[serde(default)]
    pub auth_token: Option<SecretString>,

    /// Root directory for repository working copies
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Token injected into GitHub clone URLs
    #[serde(default)]
    pub github_token: Option<SecretString>,

    /// Alternative git host replacing `https://github.com/`
    #[serde(default)]
    pub git_url: Option<String>,

    /// Default (Docker Registry v2) registry
    #[serde(default)]
    pub docker_registry: DockerRegistrySettings,

    /// Quay registry, selected for `quay.io/` images
    #[serde(default)]
    pub quay_registry: QuayRegistrySettings,

    /// Alert forwarding
    #[serde(default)]
    pub alerting: AlertingSettings,

    /// Tag resolution polling
    #[serde(default)]
    pub tag_resolution: TagResolutionSettings,

    /// Deployable repositories
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("/tmp/deployer")
}

impl Settings {
    /// Load settings from `config.yml` and `config.override.yml` in the
    /// working directory plus the environment.
    pub fn load() -> DeployResult<Self> {
        Self::load_from(&[Path::new("config.yml"), Path::new("config.override.yml")])
    }

    /// Load settings from the given files (later files override earlier ones;
    /// missing files are skipped) plus the environment.
    pub fn load_from(paths: &[&Path]) -> DeployResult<Self> {
        let mut builder = Config::builder();
        for path in paths {
            builder = builder.add_source(
                ConfigFile::from(path.to_path_buf())
                    .format(FileFormat::Yaml)
                    .required(false),
            );
        }
        builder
            .add_source(
                Environment::with_prefix("DEPLOYER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Parse settings from an in-memory YAML document
    pub fn from_yaml(contents: &str) -> DeployResult<Self> {
        Config::builder()
            .add_source(ConfigFile::from_str(contents, FileFormat::Yaml))
            .build()
            .and_then(|c| c.try_deserialize::<Settings>())
            .map_err(|e| DeployError::Config(e.to_string()))
    }

    /// Validated repository configurations
    pub fn repositories(&self) -> DeployResult<Vec<RepositoryConfig>> {
        if self.repositories.is_empty() {
            return Err(DeployError::Config("No repositories defined!".to_string()));
        }
        let mut names = HashSet::new();
        if let Some(duplicate) = self.repositories.iter().find(|r| !names.insert(&r.name)) {
            return Err(DeployError::Config(format!(
                "Repository {} is defined more than once",
                duplicate.name
            )));
        }
        self.repositories
            .iter()
            .cloned()
            .map(RepositoryConfig::try_from)
            .collect()
    }

    /// Refuse to run an unauthenticated API in production
    pub fn validate(&self) -> DeployResult<()> {
        if self.auth_token.is_none() && self.environment == "production" {
            return Err(DeployError::Config(
                "auth_token must be set in production".to_string(),
            ));
        }
        self.repositories()?;
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on a single deploy request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    600
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Docker Registry v2 settings
#[derive(Debug, Clone, Deserialize)]
pub struct DockerRegistrySettings {
    #[serde(default = "default_docker_registry_url")]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<SecretString>,
}

fn default_docker_registry_url() -> String {
    "https://registry.hub.docker.com".to_string()
}

impl Default for DockerRegistrySettings {
    fn default() -> Self {
        Self {
            url: default_docker_registry_url(),
            username: None,
            password: None,
        }
    }
}

/// Quay API settings
#[derive(Debug, Clone, Deserialize)]
pub struct QuayRegistrySettings {
    #[serde(default = "default_quay_url")]
    pub url: String,

    #[serde(default)]
    pub api_token: Option<SecretString>,
}

fn default_quay_url() -> String {
    "https://quay.io".to_string()
}

impl Default for QuayRegistrySettings {
    fn default() -> Self {
        Self {
            url: default_quay_url(),
            api_token: None,
        }
    }
}

/// Alert webhook settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertingSettings {
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,
}

/// Tag resolution settings
#[derive(Debug, Clone, Deserialize)]
pub struct TagResolutionSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay() -> u64 {
    1
}

impl Default for TagResolutionSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::repository::SourceLocation;

    #[test]
    fn test_parse_settings_with_defaults() {
        let settings = Settings::from_yaml(
            r#"
repositories:
  - name: myapp
    github: me/myapp
  - name: legacy
    subversion: svn://svn.example.com/legacy
    kube_resource: deploy/k8s
"#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.tag_resolution.max_attempts, 5);
        assert_eq!(settings.docker_registry.url, "https://registry.hub.docker.com");

        let repositories = settings.repositories().unwrap();
        assert_eq!(repositories.len(), 2);
        assert_eq!(repositories[0].manifest_directory, "kubernetes");
        assert_eq!(
            repositories[1].source,
            SourceLocation::Centralized("svn://svn.example.com/legacy".to_string())
        );
        assert_eq!(repositories[1].manifest_directory, "deploy/k8s");
    }

    #[test]
    fn test_repository_without_location_is_rejected() {
        let settings = Settings::from_yaml(
            r#"
repositories:
  - name: nowhere
"#,
        )
        .unwrap();

        let err = settings.repositories().unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_duplicate_repository_names_are_rejected() {
        let settings = Settings::from_yaml(
            r#"
repositories:
  - name: myapp
    github: me/myapp
  - name: myapp
    github: me/myapp
    kube_resource: kubernetes/staging
"#,
        )
        .unwrap();

        let err = settings.repositories().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_production_requires_auth_token() {
        let settings = Settings::from_yaml(
            r#"
environment: production
repositories:
  - name: myapp
    github: me/myapp
"#,
        )
        .unwrap();

        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_no_repositories_is_rejected() {
        let settings = Settings::from_yaml("log_level: debug\n").unwrap();
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert!(settings.repositories().is_err());
    }

    #[test]
    fn test_override_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.yml");
        let overrides = dir.path().join("config.override.yml");
        std::fs::write(
            &base,
            "staging_dir: /srv/base\nrepositories:\n  - name: myapp\n    github: me/myapp\n",
        )
        .unwrap();
        std::fs::write(&overrides, "staging_dir: /srv/override\n").unwrap();

        let settings = Settings::load_from(&[base.as_path(), overrides.as_path()]).unwrap();
        assert_eq!(settings.staging_dir, PathBuf::from("/srv/override"));
        assert_eq!(settings.repositories().unwrap().len(), 1);
    }
}
