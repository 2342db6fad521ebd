//! Docker Registry v2 client

use async_trait::async_trait;
use http::header::{HeaderMap, LINK, WWW_AUTHENTICATE};
use http::StatusCode;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

use crate::errors::{DeployError, DeployResult};
use crate::registry::RegistryClient;

/// Tags requested per page
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerChallenge {
    pub realm: String,
    pub service: Option<String>,
    pub scope: Option<String>,
}

/// Parse `Bearer realm="...",service="...",scope="..."`
pub fn parse_bearer_challenge(header: &str) -> Option<BearerChallenge> {
    let params = header.trim().strip_prefix("Bearer ")?;
    let mut challenge = BearerChallenge::default();
    let mut rest = params.trim();
    while !rest.is_empty() {
        let (key, after_key) = rest.split_once('=')?;
        let after_key = after_key.trim_start();
        let (value, after_value) = match after_key.strip_prefix('"') {
            Some(quoted) => {
                let end = quoted.find('"')?;
                (&quoted[..end], &quoted[end + 1..])
            }
            None => match after_key.find(',') {
                Some(end) => (&after_key[..end], &after_key[end..]),
                None => (after_key, ""),
            },
        };
        match key.trim() {
            "realm" => challenge.realm = value.to_string(),
            "service" => challenge.service = Some(value.to_string()),
            "scope" => challenge.scope = Some(value.to_string()),
            _ => {}
        }
        rest = after_value.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    (!challenge.realm.is_empty()).then_some(challenge)
}

/// Target of a `Link: <...>; rel="next"` header
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find(|link| link.contains("rel=\"next\"") || link.contains("rel=next"))
        .and_then(|link| {
            let start = link.find('<')?;
            let end = link.find('>')?;
            (start < end).then(|| link[start + 1..end].to_string())
        })
}

/// Client for registries speaking the Docker Registry HTTP API v2
pub struct DockerRegistryClient {
    client: Client,
    base_url: Url,
    username: Option<String>,
    password: Option<SecretString>,
}

impl DockerRegistryClient {
    pub fn new(
        base_url: &str,
        username: Option<String>,
        password: Option<SecretString>,
    ) -> DeployResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| DeployError::Config(format!("invalid registry url {}: {}", base_url, e)))?;

        Ok(Self {
            client,
            base_url,
            username,
            password,
        })
    }

    /// Official images live under `library/`
    fn repository_path(image_name: &str) -> String {
        if image_name.contains('/') {
            image_name.to_string()
        } else {
            format!("library/{}", image_name)
        }
    }

    fn with_basic_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.username, &self.password) {
            (Some(username), password) => request.basic_auth(
                username,
                password.as_ref().map(|p| p.expose_secret().to_string()),
            ),
            _ => request,
        }
    }

    /// Exchange a bearer challenge for a token
    async fn fetch_token(&self, challenge: &BearerChallenge) -> DeployResult<String> {
        let mut url = Url::parse(&challenge.realm)
            .map_err(|e| DeployError::Registry(format!("invalid token realm: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = &challenge.service {
                query.append_pair("service", service);
            }
            if let Some(scope) = &challenge.scope {
                query.append_pair("scope", scope);
            }
        }
        debug!("GET {} (registry token)", url);

        let response = self.with_basic_auth(self.client.get(url)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Registry token request failed: {} - {}", status, body);
            return Err(DeployError::Registry(format!("token request failed: {}", status)));
        }

        let body: TokenResponse = response.json().await?;
        body.token
            .or(body.access_token)
            .ok_or_else(|| DeployError::Registry("token response without token".to_string()))
    }
}

#[async_trait]
impl RegistryClient for DockerRegistryClient {
    async fn tags(&self, image_name: &str) -> DeployResult<Vec<String>> {
        let path = format!(
            "v2/{}/tags/list?n={}",
            Self::repository_path(image_name),
            PAGE_SIZE
        );
        let mut next = Some(
            self.base_url
                .join(&path)
                .map_err(|e| DeployError::Registry(e.to_string()))?,
        );
        let mut token: Option<String> = None;
        let mut tags = Vec::new();

        while let Some(url) = next.take() {
            debug!("GET {}", url);
            let mut response = self.send(url.clone(), token.as_deref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED && token.is_none() {
                let challenge = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(parse_bearer_challenge)
                    .ok_or_else(|| {
                        DeployError::Registry(format!("unauthorized for {}", image_name))
                    })?;
                token = Some(self.fetch_token(&challenge).await?);
                response = self.send(url.clone(), token.as_deref()).await?;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!("Listing tags of {} failed: {} - {}", image_name, status, body);
                return Err(DeployError::Registry(format!(
                    "listing tags of {} failed: {}",
                    image_name, status
                )));
            }

            next = next_link(response.headers())
                .map(|link| url.join(&link))
                .transpose()
                .map_err(|e| DeployError::Registry(e.to_string()))?;

            let page: TagList = response.json().await?;
            tags.extend(page.tags.unwrap_or_default());
        }

        Ok(tags)
    }
}

impl DockerRegistryClient {
    async fn send(&self, url: Url, token: Option<&str>) -> DeployResult<reqwest::Response> {
        let request = self.client.get(url);
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => self.with_basic_auth(request),
        };
        Ok(request.send().await?)
    }
}
