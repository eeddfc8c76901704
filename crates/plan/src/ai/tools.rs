//! Tool calls the chat model may emit.
//!
//! The set is closed: an invocation naming anything else is rejected as
//! [`PlanError::UnknownTool`] instead of being silently dropped. Arguments
//! are deserialized strictly, so a malformed payload surfaces as
//! [`PlanError::InvalidToolArgs`] with the offending tool named.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entities::{DocumentKind, ProjectId, TaskDocument, TaskId};
use crate::errors::{PlanError, PlanResult};
use crate::hierarchy::{HierarchyManager, NewTask};

use super::provider::{ToolInvocation, ToolSpec};

/// One task inside an `add_tasks` batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub hours: Option<f64>,
}

/// One move inside a `restructure_plan` batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMove {
    pub task_id: TaskId,
    /// `None` moves the task to the project root.
    #[serde(default)]
    pub new_parent_id: Option<TaskId>,
}

/// A validated tool call, ready to execute.
#[derive(Debug, Clone)]
pub enum ToolCall {
    /// Create a top-level phase in the current project.
    CreatePhase { title: String, description: String },
    /// Add a batch of tasks under an existing phase or task.
    AddTasks {
        phase_id: TaskId,
        tasks: Vec<NewTaskSpec>,
    },
    /// Reparent tasks within the project tree.
    RestructurePlan { moves: Vec<TaskMove> },
    /// Create or replace an implementation-plan document on a task.
    UpsertImplementationPlan {
        task_id: TaskId,
        title: String,
        content: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePhaseArgs {
    title: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTasksArgs {
    phase_id: TaskId,
    tasks: Vec<NewTaskSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestructurePlanArgs {
    moves: Vec<TaskMove>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertImplementationPlanArgs {
    task_id: TaskId,
    title: String,
    content: String,
}

impl ToolCall {
    /// Tool declarations advertised to every backend.
    pub fn declarations() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "create_phase".to_string(),
                description: "Create a new top-level phase in the project plan.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "Phase title, unique among phases"},
                        "description": {"type": "string", "description": "What this phase covers"}
                    },
                    "required": ["title"]
                }),
            },
            ToolSpec {
                name: "add_tasks".to_string(),
                description: "Add one or more tasks under an existing phase or task.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "phaseId": {"type": "string", "description": "UUID of the parent phase or task"},
                        "tasks": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "title": {"type": "string"},
                                    "description": {"type": "string"},
                                    "objective": {"type": "string"},
                                    "hours": {"type": "number", "description": "Estimated hours"}
                                },
                                "required": ["title"]
                            }
                        }
                    },
                    "required": ["phaseId", "tasks"]
                }),
            },
            ToolSpec {
                name: "restructure_plan".to_string(),
                description: "Move tasks to new parents within the project tree.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "moves": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "taskId": {"type": "string", "description": "UUID of the task to move"},
                                    "newParentId": {"type": "string", "description": "UUID of the new parent; omit to move to the root"}
                                },
                                "required": ["taskId"]
                            }
                        }
                    },
                    "required": ["moves"]
                }),
            },
            ToolSpec {
                name: "upsert_implementation_plan".to_string(),
                description: "Create or replace the implementation-plan document of a task."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "taskId": {"type": "string", "description": "UUID of the task"},
                        "title": {"type": "string", "description": "Document title"},
                        "content": {"type": "string", "description": "Markdown body"}
                    },
                    "required": ["taskId", "title", "content"]
                }),
            },
        ]
    }

    /// Validate a raw invocation against the closed tool set.
    pub fn parse(invocation: &ToolInvocation) -> PlanResult<Self> {
        fn args<T: serde::de::DeserializeOwned>(
            tool: &str,
            value: &serde_json::Value,
        ) -> PlanResult<T> {
            serde_json::from_value(value.clone()).map_err(|e| PlanError::InvalidToolArgs {
                tool: tool.to_string(),
                reason: e.to_string(),
            })
        }

        match invocation.name.as_str() {
            "create_phase" => {
                let a: CreatePhaseArgs = args("create_phase", &invocation.arguments)?;
                Ok(Self::CreatePhase {
                    title: a.title,
                    description: a.description,
                })
            }
            "add_tasks" => {
                let a: AddTasksArgs = args("add_tasks", &invocation.arguments)?;
                Ok(Self::AddTasks {
                    phase_id: a.phase_id,
                    tasks: a.tasks,
                })
            }
            "restructure_plan" => {
                let a: RestructurePlanArgs = args("restructure_plan", &invocation.arguments)?;
                Ok(Self::RestructurePlan { moves: a.moves })
            }
            "upsert_implementation_plan" => {
                let a: UpsertImplementationPlanArgs =
                    args("upsert_implementation_plan", &invocation.arguments)?;
                Ok(Self::UpsertImplementationPlan {
                    task_id: a.task_id,
                    title: a.title,
                    content: a.content,
                })
            }
            other => Err(PlanError::UnknownTool {
                name: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreatePhase { .. } => "create_phase",
            Self::AddTasks { .. } => "add_tasks",
            Self::RestructurePlan { .. } => "restructure_plan",
            Self::UpsertImplementationPlan { .. } => "upsert_implementation_plan",
        }
    }

    /// Run the call against the project tree, returning a JSON summary of
    /// what changed.
    pub fn execute(
        self,
        hierarchy: &HierarchyManager,
        project_id: ProjectId,
    ) -> PlanResult<serde_json::Value> {
        match self {
            Self::CreatePhase { title, description } => {
                let mut new_task = NewTask::new(project_id, None, title);
                new_task.description = description;
                let phase = hierarchy.create_task(new_task)?;
                tracing::info!(phase_id = %phase.id, title = %phase.title, "Created phase");
                Ok(json!({
                    "phaseId": phase.id,
                    "title": phase.title,
                }))
            }
            Self::AddTasks { phase_id, tasks } => {
                // Parent must exist and belong to this project
                let parent = hierarchy.store().get_task(phase_id)?;
                if parent.project_id != project_id {
                    return Err(PlanError::TaskNotFound { task_id: phase_id });
                }

                let mut created = Vec::with_capacity(tasks.len());
                for spec in tasks {
                    let mut new_task = NewTask::new(project_id, Some(phase_id), spec.title);
                    new_task.description = spec.description;
                    new_task.objective = spec.objective;
                    new_task.hours = spec.hours;
                    let task = hierarchy.create_task(new_task)?;
                    created.push(json!({"taskId": task.id, "title": task.title}));
                }
                tracing::info!(phase_id = %phase_id, count = created.len(), "Added tasks");
                Ok(json!({"phaseId": phase_id, "created": created}))
            }
            Self::RestructurePlan { moves } => {
                let mut moved = Vec::with_capacity(moves.len());
                for mv in moves {
                    let task = hierarchy.store().get_task(mv.task_id)?;
                    if task.project_id != project_id {
                        return Err(PlanError::TaskNotFound {
                            task_id: mv.task_id,
                        });
                    }
                    let task = hierarchy.relocate(mv.task_id, mv.new_parent_id)?;
                    moved.push(json!({
                        "taskId": task.id,
                        "newParentId": task.parent_id,
                        "level": task.level,
                    }));
                }
                Ok(json!({"moved": moved}))
            }
            Self::UpsertImplementationPlan {
                task_id,
                title,
                content,
            } => {
                let task = hierarchy.store().get_task(task_id)?;
                if task.project_id != project_id {
                    return Err(PlanError::TaskNotFound { task_id });
                }
                let doc = hierarchy.store().upsert_document(TaskDocument::new(
                    task_id,
                    title,
                    content,
                    DocumentKind::Plan,
                ))?;
                tracing::info!(task_id = %task_id, doc_id = %doc.id, "Upserted implementation plan");
                Ok(json!({"documentId": doc.id, "taskId": task_id, "title": doc.title}))
            }
        }
    }
}
