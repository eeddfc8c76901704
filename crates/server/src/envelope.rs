//! Uniform JSON response envelope and error status mapping.
//!
//! Every route replies with `{ success, data | error, timestamp }`; a
//! `PlanError` is translated to an HTTP status here and nowhere else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use plan::PlanError;
use serde::Serialize;

/// Response envelope shared by all routes.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        })
    }
}

/// A `PlanError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub PlanError);

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        Self(err)
    }
}

/// Handler result: enveloped data or a mapped error.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn status_for(err: &PlanError) -> StatusCode {
    match err {
        PlanError::Validation { .. }
        | PlanError::InvalidStatus { .. }
        | PlanError::InvalidTransition { .. }
        | PlanError::UnknownTool { .. }
        | PlanError::InvalidToolArgs { .. } => StatusCode::BAD_REQUEST,

        PlanError::Unauthorized => StatusCode::UNAUTHORIZED,

        PlanError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,

        PlanError::ProjectNotFound { .. }
        | PlanError::TaskNotFound { .. }
        | PlanError::SubtaskNotFound { .. }
        | PlanError::DocumentNotFound { .. }
        | PlanError::EstimationNotFound { .. }
        | PlanError::UserNotFound { .. } => StatusCode::NOT_FOUND,

        PlanError::Conflict { .. } | PlanError::CycleDetected { .. } => StatusCode::CONFLICT,

        PlanError::Ai(_) | PlanError::AiResponseParse { .. } => StatusCode::BAD_GATEWAY,

        PlanError::ProviderNotConfigured => StatusCode::SERVICE_UNAVAILABLE,

        PlanError::Storage { .. } | PlanError::JsonParse { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "Request rejected");
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0.to_string()),
            timestamp: Utc::now(),
        };
        (status, Json(body)).into_response()
    }
}
