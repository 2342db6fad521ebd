//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{DeployError, DeployResult};
use crate::server::auth::require_basic_auth;
use crate::server::handlers::{
    deploy_canary_handler, deploy_handler, fallback_handler, repositories_handler,
    repository_handler, tags_handler, version_handler,
};
use crate::server::state::ServerState;
use crate::storage::settings::ServerSettings;

/// Routes of the deploy API
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(repositories_handler))
        .route("/version", get(version_handler))
        .route("/{repository}", get(repository_handler))
        .route("/{repository}/tags", get(tags_handler))
        .route("/{repository}/deploy", post(deploy_handler))
        .route("/{repository}/deploy_canary", post(deploy_canary_handler))
        .fallback(fallback_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_basic_auth,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerSettings,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> DeployResult<JoinHandle<DeployResult<()>>> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DeployError::Server(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| DeployError::Server(e.to_string()))
    });

    Ok(handle)
}
