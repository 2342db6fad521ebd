//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::app::state::AppState;
use crate::errors::{DeployError, DeployResult};
use crate::server::serve;
use crate::storage::settings::Settings;

/// Run the deploy server until `shutdown_signal` resolves
pub async fn run(
    settings: Settings,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> DeployResult<()> {
    info!("Initializing deployer...");

    let app_state = AppState::init(&settings).await.inspect_err(|e| {
        error!("Failed to start deployer: {}", e);
    })?;
    let server_state = Arc::new(app_state.server_state(&settings));

    let handle = serve(&settings.server, server_state, shutdown_signal).await?;
    let result = handle
        .await
        .map_err(|e| DeployError::Internal(format!("server task failed: {}", e)))?;

    let pending = app_state.events.pending();
    if pending > 0 {
        info!("{} request timelines were not flushed", pending);
    }
    info!("Deployer stopped");
    result
}
