//! Estimation handlers.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use plan::entities::{Estimation, EstimationId, EstimationStatus, ProjectId};
use plan::usage;
use plan::PlanError;
use serde::Deserialize;

use crate::envelope::{ApiResponse, ApiResult};
use crate::handlers::principal;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationRequest {
    /// Free-form project brief to estimate.
    pub brief: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationStatusRequest {
    pub status: String,
}

/// `POST /api/projects/{id}/estimations`
///
/// Quota-gated: the gate runs before the provider call so a free-tier user
/// at their limit never triggers a model invocation, and again inside
/// `record_estimation` so the count is authoritative at write time.
pub async fn create_estimation(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    headers: HeaderMap,
    Json(request): Json<EstimationRequest>,
) -> ApiResult<Estimation> {
    let user_id = principal(&headers)?;
    let project = state.store.get_project(project_id)?;
    if project.owner_id != user_id {
        return Err(PlanError::Unauthorized.into());
    }

    let now = Utc::now();
    usage::check_estimation_quota(&state.store, user_id, now)?;

    let breakdown = state
        .orchestrator
        .generate_breakdown(project_id, &request.brief)
        .await?;

    let estimation = usage::record_estimation(&state.store, user_id, project_id, breakdown, now)?;
    state.persist().await;

    tracing::info!(
        estimation_id = %estimation.id,
        project_id = %project_id,
        total_hours = estimation.breakdown.total_hours(),
        "Created estimation"
    );
    Ok(ApiResponse::ok(estimation))
}

/// `GET /api/estimations/{id}`
pub async fn get_estimation(
    State(state): State<AppState>,
    Path(estimation_id): Path<EstimationId>,
) -> ApiResult<Estimation> {
    let estimation = state.store.get_estimation(estimation_id)?;
    Ok(ApiResponse::ok(estimation))
}

/// `PUT /api/estimations/{id}/status`
pub async fn set_estimation_status(
    State(state): State<AppState>,
    Path(estimation_id): Path<EstimationId>,
    Json(request): Json<EstimationStatusRequest>,
) -> ApiResult<Estimation> {
    let status: EstimationStatus = request.status.parse()?;
    let estimation = state.store.set_estimation_status(estimation_id, status)?;
    state.persist().await;
    Ok(ApiResponse::ok(estimation))
}
