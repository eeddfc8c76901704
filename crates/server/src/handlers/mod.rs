//! Request handlers.

pub mod admin;
pub mod chat;
pub mod estimations;
pub mod projects;
pub mod tasks;

use axum::http::HeaderMap;
use plan::entities::UserId;
use plan::PlanError;

use crate::envelope::ApiError;

/// Session principal from the `x-user-id` header.
///
/// Authentication itself is an external collaborator; the gateway in front
/// of this service is trusted to have verified the id.
pub fn principal(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<UserId>().ok())
        .ok_or(ApiError(PlanError::Unauthorized))
}
