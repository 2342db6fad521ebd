//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::DeployError;
use crate::events::Event;
use crate::models::repository::RepositoryEntry;
use crate::models::request::DeployRequest;
use crate::server::state::ServerState;
use crate::utils::{generate_uuid, version_info};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoriesResponse {
    pub repositories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryResponse {
    pub repository: RepositoryEntry,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct TagsResponse {
    pub count: usize,
    pub names: Vec<String>,
}

/// Version to deploy, from the query string or a form body
#[derive(Debug, Default, Deserialize)]
pub struct DeployParams {
    pub commit: Option<String>,
    pub tag: Option<String>,
}

impl DeployParams {
    fn merge(self, other: DeployParams) -> DeployParams {
        DeployParams {
            commit: non_empty(self.commit).or(non_empty(other.commit)),
            tag: non_empty(self.tag).or(non_empty(other.tag)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(MessageResponse {
            message: "not found.".to_string(),
        }),
    )
        .into_response()
}

fn bad_request(error: &DeployError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub async fn fallback_handler() -> Response {
    not_found()
}

pub async fn repositories_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(RepositoriesResponse {
        repositories: state
            .deployer
            .repositories()
            .iter()
            .map(|repository| repository.name.clone())
            .collect(),
    })
}

pub async fn version_handler() -> impl IntoResponse {
    Json(VersionResponse {
        version: version_info().as_string(),
    })
}

pub async fn repository_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.deployer.repository(&name) {
        Ok(repository) => Json(RepositoryResponse {
            repository: RepositoryEntry::from(repository),
        })
        .into_response(),
        Err(_) => not_found(),
    }
}

pub async fn tags_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> Response {
    match state.deployer.list_tags(&name).await {
        Ok(names) => Json(TagsResponse {
            count: names.len(),
            names,
        })
        .into_response(),
        Err(e) if e.is_not_found() => not_found(),
        Err(e) => bad_request(&e),
    }
}

pub async fn deploy_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<DeployParams>,
    form: Result<Form<DeployParams>, FormRejection>,
) -> Response {
    let params = query.merge(form.map(|Form(f)| f).unwrap_or_default());
    run_deploy(&state, name, &headers, params, false).await
}

pub async fn deploy_canary_handler(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<DeployParams>,
    form: Result<Form<DeployParams>, FormRejection>,
) -> Response {
    let params = query.merge(form.map(|Form(f)| f).unwrap_or_default());
    run_deploy(&state, name, &headers, params, true).await
}

/// Deploy under a fresh request id, recording the request's timeline
async fn run_deploy(
    state: &ServerState,
    name: String,
    headers: &HeaderMap,
    params: DeployParams,
    canary: bool,
) -> Response {
    let Ok(repository) = state.deployer.repository(&name) else {
        return not_found();
    };

    let request_id = generate_uuid();
    let events = &state.events;
    events.log(&request_id, Event::label("start"));
    events.log(
        &request_id,
        Event::label(if canary { "canary" } else { "deploy" }),
    );
    events.log(
        &request_id,
        Event::pair("repository", repository.source.address()),
    );

    let mut request = DeployRequest::new(name).canary(canary).request_id(&request_id);
    request.commit = params.commit;
    request.tag = params.tag;
    info!(
        "deploy {} requested: commit={:?} tag={:?} canary={} id={}",
        request.repository, request.commit, request.tag, canary, request_id
    );

    let result = match tokio::time::timeout(state.request_timeout, state.deployer.deploy(&request))
        .await
    {
        Ok(result) => result,
        Err(_) => {
            warn!("deploy {} timed out", request_id);
            Err(DeployError::Timeout(state.request_timeout.as_secs()))
        }
    };

    match result {
        Ok(message) => {
            events.log(&request_id, Event::label("success"));
            events.flush(&request_id);
            Json(MessageResponse { message }).into_response()
        }
        Err(e) => {
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default();
            events.log(&request_id, Event::pair("user_agent", user_agent));
            events.log(&request_id, Event::from(&e));
            events.log(&request_id, Event::label("fail"));
            events.flush(&request_id);
            bad_request(&e)
        }
    }
}
