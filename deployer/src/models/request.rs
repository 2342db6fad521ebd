//! Deploy requests

/// One request to deploy a repository at a version
#[derive(Debug, Clone, Default)]
pub struct DeployRequest {
    /// Configured repository name
    pub repository: String,
    /// Revision id, or a symbolic head such as `master`
    pub commit: Option<String>,
    /// Release tag embedding the commit
    pub tag: Option<String>,
    /// Deploy a single canary replica next to the stable fleet
    pub canary: bool,
    /// Correlation key for the event timeline
    pub request_id: Option<String>,
}

impl DeployRequest {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Default::default()
        }
    }

    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn canary(mut self, canary: bool) -> Self {
        self.canary = canary;
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
