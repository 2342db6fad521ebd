//! Quay API client

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

use crate::errors::{DeployError, DeployResult};
use crate::registry::RegistryClient;

const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    tags: Vec<QuayTag>,
    #[serde(default)]
    has_additional: bool,
}

#[derive(Debug, Deserialize)]
struct QuayTag {
    name: String,
}

/// Client for the Quay repository tag API
pub struct QuayRegistryClient {
    client: Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl QuayRegistryClient {
    pub fn new(base_url: &str, api_token: Option<SecretString>) -> DeployResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| DeployError::Config(format!("invalid quay url {}: {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    async fn page(&self, image_name: &str, page: u32) -> DeployResult<TagPage> {
        let mut url = self
            .base_url
            .join(&format!("api/v1/repository/{}/tag/", image_name))
            .map_err(|e| DeployError::Registry(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &PAGE_LIMIT.to_string())
            .append_pair("onlyActiveTags", "true");
        debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Listing quay tags of {} failed: {} - {}", image_name, status, body);
            return Err(DeployError::Registry(format!(
                "listing tags of {} failed: {}",
                image_name, status
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl RegistryClient for QuayRegistryClient {
    async fn tags(&self, image_name: &str) -> DeployResult<Vec<String>> {
        let mut tags = Vec::new();
        let mut page = 1;
        loop {
            let result = self.page(image_name, page).await?;
            tags.extend(result.tags.into_iter().map(|tag| tag.name));
            if !result.has_additional {
                break;
            }
            page += 1;
        }
        Ok(tags)
    }
}
