//! Task document entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DocumentId, TaskId};

/// Kind of generated or uploaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    Report,
    Plan,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::Plan => write!(f, "plan"),
        }
    }
}

/// A generated or uploaded artifact tied to a task.
///
/// Titles are unique within a single task; writing an existing title
/// replaces the content (upsert).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    pub id: DocumentId,

    /// Owning task
    pub task_id: TaskId,

    /// Title, unique per task
    pub title: String,

    /// Markdown body
    pub content: String,

    pub kind: DocumentKind,

    /// Object-storage pointer when the content was uploaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskDocument {
    pub fn new(
        task_id: TaskId,
        title: impl Into<String>,
        content: impl Into<String>,
        kind: DocumentKind,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_id,
            title: title.into(),
            content: content.into(),
            kind,
            url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_new() {
        let task_id = Uuid::new_v4();
        let doc = TaskDocument::new(task_id, "Plan", "# Plan", DocumentKind::Plan);
        assert_eq!(doc.task_id, task_id);
        assert_eq!(doc.kind, DocumentKind::Plan);
        assert!(doc.url.is_none());
    }
}
