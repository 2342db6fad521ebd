//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::DeployResult;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.path.clone()
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> DeployResult<()> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Get a subdirectory
    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// All files below this directory whose extension is one of
    /// `extensions`, sorted by path. A missing directory yields no files.
    pub async fn list_files_recursive(&self, extensions: &[&str]) -> DeployResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.exists().await {
            return Ok(files);
        }

        let mut pending = vec![self.path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
                {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
