//! Task tree handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use plan::entities::{
    DocumentKind, ProjectId, SubTask, Task, TaskDocument, TaskId, TaskStatus,
};
use plan::NewTask;
use serde::{Deserialize, Serialize};

use crate::envelope::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocateRequest {
    /// `null` moves the task to the project root.
    #[serde(default)]
    pub new_parent_id: Option<TaskId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default = "default_kind")]
    pub kind: DocumentKind,
}

fn default_kind() -> DocumentKind {
    DocumentKind::Plan
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleCheckQuery {
    pub title: String,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleCheck {
    pub unique: bool,
    /// The title creation would actually use.
    pub suggestion: String,
}

/// A task with its recursively nested children, in sibling order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<TreeNode>,
}

/// A task with its immediate context.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub children: Vec<Task>,
    pub subtasks: Vec<SubTask>,
    pub documents: Vec<TaskDocument>,
}

/// `POST /api/projects/{id}/tasks`
pub async fn create_task(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<Task> {
    state.store.get_project(project_id)?;

    let mut new_task = NewTask::new(project_id, request.parent_id, request.title);
    new_task.description = request.description;
    new_task.objective = request.objective;
    new_task.hours = request.hours;

    let task = state.hierarchy.create_task(new_task)?;
    state.persist().await;
    Ok(ApiResponse::ok(task))
}

fn subtree(state: &AppState, task: Task) -> TreeNode {
    let children = state
        .store
        .children_of(task.id)
        .into_iter()
        .map(|child| subtree(state, child))
        .collect();
    TreeNode { task, children }
}

/// `GET /api/projects/{id}/tree`
pub async fn get_tree(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
) -> ApiResult<Vec<TreeNode>> {
    state.store.get_project(project_id)?;
    let tree = state
        .store
        .roots_of(project_id)
        .into_iter()
        .map(|root| subtree(&state, root))
        .collect();
    Ok(ApiResponse::ok(tree))
}

/// `GET /api/tasks/{id}`
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> ApiResult<TaskDetail> {
    let task = state.store.get_task(task_id)?;
    let detail = TaskDetail {
        children: state.store.children_of(task_id),
        subtasks: state.store.subtasks_of(task_id),
        documents: state.store.documents_of(task_id),
        task,
    };
    Ok(ApiResponse::ok(detail))
}

/// `PUT /api/tasks/{id}/status`
pub async fn set_status(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<Task> {
    let status: TaskStatus = request.status.parse()?;
    let task = state.store.update_task(task_id, |t| {
        if let Some(branch) = &request.branch {
            t.branch = Some(branch.clone());
        }
        t.set_status(status)
    })?;
    state.persist().await;
    Ok(ApiResponse::ok(task))
}

/// `PUT /api/tasks/{id}/relocate`
pub async fn relocate(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<RelocateRequest>,
) -> ApiResult<Task> {
    let task = state.hierarchy.relocate(task_id, request.new_parent_id)?;
    state.persist().await;
    Ok(ApiResponse::ok(task))
}

/// `POST /api/tasks/{id}/subtasks`
pub async fn add_subtask(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<SubtaskRequest>,
) -> ApiResult<SubTask> {
    let order = state.store.subtasks_of(task_id).len() as u32;
    let subtask = state
        .store
        .add_subtask(SubTask::new(task_id, request.title, order))?;
    state.persist().await;
    Ok(ApiResponse::ok(subtask))
}

/// `PUT /api/tasks/{id}/documents`
pub async fn upsert_document(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(request): Json<DocumentRequest>,
) -> ApiResult<TaskDocument> {
    let doc = state.store.upsert_document(TaskDocument::new(
        task_id,
        request.title,
        request.content,
        request.kind,
    ))?;
    state.persist().await;
    Ok(ApiResponse::ok(doc))
}

/// `GET /api/projects/{id}/title-check`
pub async fn title_check(
    State(state): State<AppState>,
    Path(project_id): Path<ProjectId>,
    Query(query): Query<TitleCheckQuery>,
) -> ApiResult<TitleCheck> {
    state.store.get_project(project_id)?;
    let unique = state
        .hierarchy
        .is_title_unique(project_id, query.parent_id, &query.title);
    let suggestion = state
        .hierarchy
        .ensure_unique_title(project_id, query.parent_id, &query.title);
    Ok(ApiResponse::ok(TitleCheck { unique, suggestion }))
}
