//! Task entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProjectId, TaskId};
use crate::errors::PlanError;

/// Task status values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    /// Planning alias of `Pending`; kept distinct for clients that use it.
    Todo,
    InProgress,
    Done,
    Verified,
    Closed,
}

impl TaskStatus {
    /// Whether this status marks a task as completed or beyond.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Verified | Self::Closed)
    }

    /// Whether this status means the task has not been started.
    pub fn is_planning(self) -> bool {
        matches!(self, Self::Pending | Self::Todo)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Done => write!(f, "done"),
            Self::Verified => write!(f, "verified"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "todo" | "to-do" => Ok(Self::Todo),
            "in-progress" | "inprogress" | "in_progress" => Ok(Self::InProgress),
            "done" | "completed" => Ok(Self::Done),
            "verified" => Ok(Self::Verified),
            "closed" => Ok(Self::Closed),
            _ => Err(PlanError::InvalidStatus {
                status: s.to_string(),
            }),
        }
    }
}

/// A node in a project's work breakdown tree.
///
/// Level 0 tasks are phases; deeper levels are tasks and subtask groups.
/// Sibling titles are unique per `(project_id, parent_id)` — the store's
/// title index is the hard constraint, the hierarchy manager the soft path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Title, unique among siblings
    pub title: String,

    /// Concise description of what the task involves
    #[serde(default)]
    pub description: String,

    /// What "done" means for this task
    #[serde(default)]
    pub objective: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Tree depth, 0 for phases
    #[serde(default)]
    pub level: u32,

    /// Estimated effort in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,

    /// Source-control branch the work happens on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Sibling sort key
    #[serde(default)]
    pub order: u32,

    /// Parent task, `None` for phases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,

    /// Owning project
    pub project_id: ProjectId,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with minimal required fields.
    pub fn new(
        project_id: ProjectId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            objective: String::new(),
            status: TaskStatus::default(),
            level: 0,
            hours: None,
            branch: None,
            order: 0,
            parent_id: None,
            project_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this task is a phase (root of the tree).
    pub fn is_phase(&self) -> bool {
        self.level == 0
    }

    /// Update status with validation.
    ///
    /// The main flow is pending → in-progress → done → verified → closed.
    /// Reopening is rejected: a task at `done` or later cannot move back to
    /// a planning status. In-progress without a branch is allowed but logged.
    pub fn set_status(&mut self, new_status: TaskStatus) -> Result<(), PlanError> {
        if self.status.is_terminal() && new_status.is_planning() {
            return Err(PlanError::InvalidTransition {
                task_id: self.id,
                from: self.status.to_string(),
                to: new_status.to_string(),
            });
        }

        if new_status == TaskStatus::InProgress && self.branch.is_none() {
            tracing::warn!(
                task_id = %self.id,
                title = %self.title,
                "Task moved to in-progress without a branch assignment"
            );
        }

        self.status = new_status;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let project_id = Uuid::new_v4();
        let task = Task::new(project_id, "Test Task", "A test task description");
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.level, 0);
        assert!(task.parent_id.is_none());
        assert!(task.is_phase());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "pending".parse::<TaskStatus>().unwrap(),
            TaskStatus::Pending
        );
        assert_eq!(
            "in-progress".parse::<TaskStatus>().unwrap(),
            TaskStatus::InProgress
        );
        assert_eq!(
            "verified".parse::<TaskStatus>().unwrap(),
            TaskStatus::Verified
        );
        assert!("invalid".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_main_flow_transitions() {
        let mut task = Task::new(Uuid::new_v4(), "Test", "Test");
        task.branch = Some("feature/test".to_string());
        task.set_status(TaskStatus::InProgress).unwrap();
        task.set_status(TaskStatus::Done).unwrap();
        task.set_status(TaskStatus::Verified).unwrap();
        task.set_status(TaskStatus::Closed).unwrap();
        assert_eq!(task.status, TaskStatus::Closed);
    }

    #[test]
    fn test_reopening_rejected() {
        let mut task = Task::new(Uuid::new_v4(), "Test", "Test");
        task.status = TaskStatus::Done;

        assert!(task.set_status(TaskStatus::Pending).is_err());
        assert!(task.set_status(TaskStatus::Todo).is_err());
        // Moving forward is still allowed
        assert!(task.set_status(TaskStatus::Verified).is_ok());
    }

    #[test]
    fn test_in_progress_without_branch_allowed() {
        let mut task = Task::new(Uuid::new_v4(), "Test", "Test");
        // Recommended, not enforced: only a warning is logged
        assert!(task.set_status(TaskStatus::InProgress).is_ok());
    }
}
