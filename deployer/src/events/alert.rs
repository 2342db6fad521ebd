//! Error alert subscriber

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::errors::DeployError;
use crate::events::log::EventSubscriber;
use crate::events::timeline::Timeline;

/// User agents of the internal CLI, whose failures are not alerted
const INTERNAL_AGENT_PREFIX: &str = "depctl";

/// An error worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: String,
    pub message: String,
    pub repository: Option<String>,
    pub commit: Option<String>,
    pub user_agent: Option<String>,
}

/// Destination for alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, alert: Alert) -> Result<(), DeployError>;
}

/// Forwards the first error of each timeline to an [`AlertSink`]
pub struct AlertSubscriber {
    sink: Arc<dyn AlertSink>,
}

impl AlertSubscriber {
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        Self { sink }
    }

    /// The alert for `timeline`, if it failed and was not triggered by the CLI
    pub fn alert_for(timeline: &Timeline) -> Option<Alert> {
        let (kind, message) = timeline.first_error()?;
        let user_agent = timeline.value_of("user_agent");
        if user_agent.is_some_and(|agent| agent.starts_with(INTERNAL_AGENT_PREFIX)) {
            debug!("Suppressing alert for internal client: {}", message);
            return None;
        }
        Some(Alert {
            kind: kind.to_string(),
            message: message.to_string(),
            repository: timeline.value_of("repository").map(str::to_string),
            commit: timeline.value_of("commit").map(str::to_string),
            user_agent: user_agent.map(str::to_string),
        })
    }
}

impl EventSubscriber for AlertSubscriber {
    fn receive(&self, timeline: &Timeline) {
        let Some(alert) = Self::alert_for(timeline) else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime to forward alert on: {}", alert.message);
            return;
        };
        let sink = self.sink.clone();
        runtime.spawn(async move {
            if let Err(e) = sink.notify(alert).await {
                error!("Failed to forward alert: {}", e);
            }
        });
    }
}

/// Posts alerts as JSON to a webhook
pub struct WebhookAlertSink {
    client: Client,
    url: String,
    api_key: Option<SecretString>,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, api_key: Option<SecretString>) -> Result<Self, DeployError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn notify(&self, alert: Alert) -> Result<(), DeployError> {
        let mut request = self.client.post(&self.url).json(&alert);
        if let Some(api_key) = &self.api_key {
            request = request.header("X-Api-Key", api_key.expose_secret());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DeployError::Server(format!("alert webhook {}: {}", status, body)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::events::timeline::Event;

    fn failed_timeline(user_agent: &str) -> Timeline {
        let mut timeline = Timeline::new();
        timeline.push(Event::label("start"));
        timeline.push(Event::pair("repository", "me/myapp"));
        timeline.push(Event::pair("user_agent", user_agent));
        timeline.push(Event::error("CommandFailure", "kubectl exploded"));
        timeline.push(Event::label("fail"));
        timeline
    }

    struct ChannelSink(mpsc::UnboundedSender<Alert>);

    #[async_trait]
    impl AlertSink for ChannelSink {
        async fn notify(&self, alert: Alert) -> Result<(), DeployError> {
            self.0.send(alert).map_err(|e| DeployError::Internal(e.to_string()))
        }
    }

    #[test]
    fn test_internal_client_failures_are_suppressed() {
        assert!(AlertSubscriber::alert_for(&failed_timeline("depctl/1.2.3")).is_none());
    }

    #[test]
    fn test_successful_timeline_has_no_alert() {
        let mut timeline = Timeline::new();
        timeline.push(Event::label("start"));
        timeline.push(Event::label("success"));
        assert!(AlertSubscriber::alert_for(&timeline).is_none());
    }

    #[tokio::test]
    async fn test_external_failure_is_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscriber = AlertSubscriber::new(Arc::new(ChannelSink(tx)));

        subscriber.receive(&failed_timeline("curl/8.0"));

        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.kind, "CommandFailure");
        assert_eq!(alert.message, "kubectl exploded");
        assert_eq!(alert.repository.as_deref(), Some("me/myapp"));
    }

    #[tokio::test]
    async fn test_webhook_sink_posts_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(header("X-Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let sink = WebhookAlertSink::new(
            format!("{}/alerts", server.uri()),
            Some(SecretString::from("secret".to_string())),
        )
        .unwrap();
        let alert = AlertSubscriber::alert_for(&failed_timeline("curl/8.0")).unwrap();
        sink.notify(alert).await.unwrap();
    }
}
