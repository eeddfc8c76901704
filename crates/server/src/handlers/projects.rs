//! Project handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use plan::entities::{Project, ProjectId, User};
use serde::Deserialize;

use crate::envelope::{ApiResponse, ApiResult};
use crate::handlers::principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub ai_instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionsRequest {
    /// `null` clears the instructions.
    pub ai_instructions: Option<String>,
}

/// `POST /api/projects`
pub async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Project> {
    let owner_id = principal(&headers)?;

    // First contact registers the principal; identity lives upstream.
    if state.store.get_user(owner_id).is_err() {
        let mut user = User::new(String::new());
        user.id = owner_id;
        state.store.insert_user(user);
    }

    let mut project = Project::new(owner_id, request.name);
    project.github_url = request.github_url;
    project.ai_instructions = request.ai_instructions;
    let project_id = project.id;
    state.store.insert_project(project.clone());
    state.persist().await;

    tracing::info!(project_id = %project_id, owner_id = %owner_id, "Created project");
    Ok(ApiResponse::ok(project))
}

/// `GET /api/projects/{id}`
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Project> {
    let project = state.store.get_project(project_id)?;
    Ok(ApiResponse::ok(project))
}

/// `PUT /api/projects/{id}/instructions`
pub async fn set_instructions(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    Json(request): Json<InstructionsRequest>,
) -> ApiResult<Project> {
    let project = state.store.update_project(project_id, |p| {
        p.ai_instructions = request.ai_instructions.clone();
    })?;
    state.persist().await;
    Ok(ApiResponse::ok(project))
}
