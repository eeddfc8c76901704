//! Error types for the plan crate.

use thiserror::Error;
use uuid::Uuid;

/// Comprehensive error types for planning operations
#[derive(Error, Debug, Clone)]
pub enum PlanError {
    // Lookup errors
    #[error("Project '{project_id}' not found")]
    ProjectNotFound { project_id: Uuid },

    #[error("Task '{task_id}' not found")]
    TaskNotFound { task_id: Uuid },

    #[error("Subtask '{subtask_id}' not found in task '{task_id}'")]
    SubtaskNotFound { task_id: Uuid, subtask_id: Uuid },

    #[error("Document '{title}' not found on task '{task_id}'")]
    DocumentNotFound { task_id: Uuid, title: String },

    #[error("Estimation '{estimation_id}' not found")]
    EstimationNotFound { estimation_id: Uuid },

    #[error("User '{user_id}' not found")]
    UserNotFound { user_id: Uuid },

    // Hierarchy errors
    #[error("Title '{title}' already exists in {scope}")]
    Conflict { title: String, scope: String },

    #[error("Relocating task '{task_id}' under '{ancestor_id}' would create a cycle")]
    CycleDetected { task_id: Uuid, ancestor_id: Uuid },

    #[error("Invalid status transition for task '{task_id}': {from} -> {to}")]
    InvalidTransition {
        task_id: Uuid,
        from: String,
        to: String,
    },

    #[error("Invalid status: '{status}'")]
    InvalidStatus { status: String },

    // Request errors
    #[error("Validation error: {reason}")]
    Validation { reason: String },

    #[error("Missing or invalid session principal")]
    Unauthorized,

    #[error("Estimation quota exceeded: {used} of {limit} this month")]
    QuotaExceeded { used: u32, limit: u32 },

    // AI errors
    #[error("No AI provider is configured")]
    ProviderNotConfigured,

    #[error("AI error: {0}")]
    Ai(String),

    #[error("AI response parse error: {reason}")]
    AiResponseParse { reason: String },

    #[error("Unknown tool: '{name}'")]
    UnknownTool { name: String },

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidToolArgs { tool: String, reason: String },

    // Storage errors
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("Failed to parse JSON: {reason}")]
    JsonParse { reason: String },
}

impl From<std::io::Error> for PlanError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PlanError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonParse {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for planning operations
pub type PlanResult<T> = Result<T, PlanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        let err = PlanError::TaskNotFound { task_id: id };
        assert_eq!(
            err.to_string(),
            format!("Task '{id}' not found")
        );
    }

    #[test]
    fn test_conflict_display() {
        let err = PlanError::Conflict {
            title: "Setup".to_string(),
            scope: "phase 'Backend'".to_string(),
        };
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let plan_err: PlanError = io_err.into();
        assert!(matches!(plan_err, PlanError::Storage { .. }));
    }
}
