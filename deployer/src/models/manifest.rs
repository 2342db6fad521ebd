//! Manifest documents

use serde_json::Value;

use crate::errors::DeployResult;
use crate::models::image::ImageReference;

/// Kinds whose container images receive the deploy tag
const WORKLOAD_KINDS: [&str; 3] = ["Deployment", "StatefulSet", "CronJob"];

/// Kinds that can run as a canary
const CANARY_KINDS: [&str; 2] = ["Deployment", "StatefulSet"];

const POD_CONTAINERS: &[&str] = &["spec", "template", "spec", "containers"];
const CRON_CONTAINERS: &[&str] = &[
    "spec",
    "jobTemplate",
    "spec",
    "template",
    "spec",
    "containers",
];

/// One Kubernetes resource read from a manifest file, kept as an untyped tree
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    value: Value,
}

impl ManifestDocument {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Parse a single YAML document
    pub fn from_yaml(contents: &str) -> DeployResult<Self> {
        Ok(Self::new(serde_yaml::from_str(contents)?))
    }

    /// Serialize to YAML for the cluster client
    pub fn to_yaml(&self) -> DeployResult<String> {
        Ok(serde_yaml::to_string(&self.value)?)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn kind(&self) -> &str {
        self.value.get("kind").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.value.pointer("/metadata/name").and_then(Value::as_str)
    }

    pub fn is_deployment(&self) -> bool {
        self.kind() == "Deployment"
    }

    /// Deployment, StatefulSet or CronJob
    pub fn is_workload(&self) -> bool {
        WORKLOAD_KINDS.contains(&self.kind())
    }

    /// Deployment or StatefulSet
    pub fn is_canary_eligible(&self) -> bool {
        CANARY_KINDS.contains(&self.kind())
    }

    fn containers_path(&self) -> &'static [&'static str] {
        if self.kind() == "CronJob" {
            CRON_CONTAINERS
        } else {
            POD_CONTAINERS
        }
    }

    /// Containers of a workload, empty when the path is absent
    pub fn containers(&self) -> &[Value] {
        if !self.is_workload() {
            return &[];
        }
        let mut node = &self.value;
        for key in self.containers_path() {
            match node.get(key) {
                Some(child) => node = child,
                None => return &[],
            }
        }
        node.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn containers_mut(&mut self) -> Option<&mut Vec<Value>> {
        if !self.is_workload() {
            return None;
        }
        let path = self.containers_path();
        let mut node = &mut self.value;
        for key in path {
            node = node.get_mut(key)?;
        }
        node.as_array_mut()
    }

    /// Image references of every container, in declaration order
    pub fn images(&self) -> Vec<ImageReference> {
        self.containers()
            .iter()
            .filter_map(|container| container.get("image").and_then(Value::as_str))
            .map(ImageReference::parse)
            .collect()
    }
}

impl From<Value> for ManifestDocument {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
