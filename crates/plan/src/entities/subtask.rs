//! Subtask entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SubTaskId, TaskId};

/// Lightweight checklist item owned by a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: SubTaskId,

    /// Owning task
    pub task_id: TaskId,

    pub title: String,

    #[serde(default)]
    pub done: bool,

    /// Sort key within the task
    #[serde(default)]
    pub order: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    pub fn new(task_id: TaskId, title: impl Into<String>, order: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_id,
            title: title.into(),
            done: false,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_done(&mut self, done: bool) {
        self.done = done;
        self.updated_at = Utc::now();
    }
}
