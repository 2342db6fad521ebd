//! `kubectl` backed cluster client

use async_trait::async_trait;

use crate::cluster::ClusterClient;
use crate::errors::DeployResult;
use crate::vcs::command;

/// Runs `kubectl` against the current context, manifests on stdin
#[derive(Debug, Clone)]
pub struct KubectlClient {
    program: String,
}

impl KubectlClient {
    pub fn new() -> Self {
        Self::with_program("kubectl")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for KubectlClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn apply(&self, manifest: &str) -> DeployResult<String> {
        command::run(&self.program, &["apply", "-f", "-"], None, Some(manifest)).await
    }

    async fn delete(&self, manifest: &str) -> DeployResult<String> {
        command::run(
            &self.program,
            &["delete", "--ignore-not-found=true", "-f", "-"],
            None,
            Some(manifest),
        )
        .await
    }
}
