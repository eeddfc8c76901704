//! Chat handlers.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use plan::ai::{ChatMessage, ChatOutcome};
use plan::entities::TaskId;
use serde::Deserialize;
use std::convert::Infallible;

use crate::envelope::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Conversation so far, oldest first. The system prompt is injected
    /// server-side.
    pub messages: Vec<ChatMessage>,
}

/// `POST /api/tasks/{id}/chat`
pub async fn chat(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatOutcome> {
    let outcome = state.orchestrator.respond(task_id, &request.messages).await?;
    // Tool calls may have mutated the plan
    if !outcome.tool_reports.is_empty() {
        state.persist().await;
    }
    Ok(ApiResponse::ok(outcome))
}

/// `POST /api/tasks/{id}/chat/stream`
///
/// SSE stream of text chunks; a provider error mid-stream arrives as an
/// `error` event, then the stream closes.
pub async fn chat_stream(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let text_stream = state
        .orchestrator
        .stream_answer(task_id, &request.messages)
        .await?;

    let events = text_stream.map(|chunk| {
        Ok(match chunk {
            Ok(text) => Event::default().data(text),
            Err(e) => Event::default().event("error").data(e.to_string()),
        })
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
