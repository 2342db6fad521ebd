//! Container image references

use std::fmt;

/// An image reference split into repository and optional tag.
///
/// `registry.example.com:5000/team/app` has no tag: a segment after the last
/// colon only counts as a tag when it contains no `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    pub repository: String,
    pub tag: Option<String>,
}

impl ImageReference {
    pub fn parse(image: &str) -> Self {
        match image.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => Self {
                repository: repository.to_string(),
                tag: Some(tag.to_string()),
            },
            _ => Self {
                repository: image.to_string(),
                tag: None,
            },
        }
    }

    /// Whether the reference pins a tag of its own
    pub fn has_explicit_tag(&self) -> bool {
        self.tag.is_some()
    }

    /// The same repository at `tag`
    pub fn with_tag(&self, tag: &str) -> Self {
        Self {
            repository: self.repository.clone(),
            tag: Some(tag.to_string()),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.repository, tag),
            None => f.write_str(&self.repository),
        }
    }
}
