//! Manifest store reader

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::DeployResult;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::models::manifest::ManifestDocument;

const MANIFEST_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Load every manifest document below `manifest_directory` of a checkout.
///
/// Files are read in path order, each may hold several `---` separated
/// documents. Empty documents are skipped, a missing directory yields none.
pub async fn load_manifests(
    checkout_dir: &Path,
    manifest_directory: &str,
) -> DeployResult<Vec<ManifestDocument>> {
    let dir = Dir::new(checkout_dir.join(manifest_directory));
    let mut documents = Vec::new();

    for path in dir.list_files_recursive(&MANIFEST_EXTENSIONS).await? {
        let contents = File::new(&path).read_string().await?;
        let parsed = parse_documents(&contents)?;
        debug!("read {} documents from {}", parsed.len(), path.display());
        documents.extend(parsed);
    }

    Ok(documents)
}

/// Split a multi-document YAML string into manifests
pub fn parse_documents(contents: &str) -> DeployResult<Vec<ManifestDocument>> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(ManifestDocument::new(value));
        }
    }
    Ok(documents)
}
