//! Application state

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cluster::KubectlClient;
use crate::deploy::Deployer;
use crate::errors::DeployResult;
use crate::events::alert::{AlertSubscriber, WebhookAlertSink};
use crate::events::audit::AuditLogSubscriber;
use crate::events::EventLog;
use crate::registry::{DockerRegistryClient, QuayRegistryClient, Registries};
use crate::server::ServerState;
use crate::storage::layout::StagingLayout;
use crate::storage::settings::Settings;
use crate::tags::TagResolver;
use crate::utils::BackoffOptions;
use crate::vcs::{GitCli, SubversionCli, VersionControl};

/// Long-lived collaborators built from the settings
pub struct AppState {
    pub events: Arc<EventLog>,
    pub deployer: Arc<Deployer>,
}

impl AppState {
    pub async fn init(settings: &Settings) -> DeployResult<Self> {
        let events = Arc::new(init_event_log(settings)?);

        let layout = StagingLayout::new(&settings.staging_dir);
        layout.setup().await?;
        info!("Working copies live in {}", layout.base_dir.display());

        let vcs = Arc::new(VersionControl::new(
            layout,
            Arc::new(GitCli::new(
                settings.github_token.clone(),
                settings.git_url.clone(),
            )),
            Arc::new(SubversionCli::default()),
            events.clone(),
        ));

        let registries = Registries::new(
            Arc::new(DockerRegistryClient::new(
                &settings.docker_registry.url,
                settings.docker_registry.username.clone(),
                settings.docker_registry.password.clone(),
            )?),
            Arc::new(QuayRegistryClient::new(
                &settings.quay_registry.url,
                settings.quay_registry.api_token.clone(),
            )?),
        );
        let tags = TagResolver::new(
            registries,
            BackoffOptions {
                base_delay: Duration::from_secs(settings.tag_resolution.base_delay_secs),
                max_attempts: settings.tag_resolution.max_attempts,
            },
        );

        let deployer = Arc::new(Deployer::new(
            settings.repositories()?,
            vcs,
            tags,
            Arc::new(KubectlClient::new()),
            events.clone(),
        ));

        Ok(Self { events, deployer })
    }

    pub fn server_state(&self, settings: &Settings) -> ServerState {
        ServerState::new(
            self.deployer.clone(),
            self.events.clone(),
            settings.auth_token.clone(),
            Duration::from_secs(settings.server.request_timeout_secs),
        )
    }
}

fn init_event_log(settings: &Settings) -> DeployResult<EventLog> {
    let events = EventLog::new();
    events.append_subscriber(Arc::new(AuditLogSubscriber));
    if let Some(url) = &settings.alerting.webhook_url {
        info!("Forwarding deploy failures to {}", url);
        let sink = WebhookAlertSink::new(url.clone(), settings.alerting.api_key.clone())?;
        events.append_subscriber(Arc::new(AlertSubscriber::new(Arc::new(sink))));
    }
    Ok(events)
}
