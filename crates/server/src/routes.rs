//! HTTP router.

use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, chat, estimations, projects, tasks};
use crate::state::AppState;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Projects
        .route("/api/projects", post(projects::create_project))
        .route("/api/projects/{id}", get(projects::get_project))
        .route(
            "/api/projects/{id}/instructions",
            put(projects::set_instructions),
        )
        // Task tree
        .route("/api/projects/{id}/tasks", post(tasks::create_task))
        .route("/api/projects/{id}/tree", get(tasks::get_tree))
        .route("/api/projects/{id}/title-check", get(tasks::title_check))
        .route("/api/tasks/{id}", get(tasks::get_task))
        .route("/api/tasks/{id}/status", put(tasks::set_status))
        .route("/api/tasks/{id}/relocate", put(tasks::relocate))
        .route("/api/tasks/{id}/subtasks", post(tasks::add_subtask))
        .route("/api/tasks/{id}/documents", put(tasks::upsert_document))
        // Chat
        .route("/api/tasks/{id}/chat", post(chat::chat))
        .route("/api/tasks/{id}/chat/stream", post(chat::chat_stream))
        // Estimations
        .route(
            "/api/projects/{id}/estimations",
            post(estimations::create_estimation),
        )
        .route("/api/estimations/{id}", get(estimations::get_estimation))
        .route(
            "/api/estimations/{id}/status",
            put(estimations::set_estimation_status),
        )
        // Admin
        .route("/api/admin/reconcile", post(admin::reconcile))
        // Health check
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy"}))
}
