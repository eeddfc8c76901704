//! Task chat prompt template.
//!
//! Builds the system prompt for the per-task assistant from the task,
//! its children and documents, and the project's master instructions.

use serde::Serialize;

use crate::entities::{Task, TaskDocument};

use super::PromptTemplate;

/// Child task summary injected into the prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSummary {
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
}

impl From<&Task> for ChildSummary {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            status: task.status.to_string(),
            hours: task.hours,
        }
    }
}

/// Document summary injected into the prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub title: String,
    pub kind: String,
    pub content: String,
}

impl From<&TaskDocument> for DocumentSummary {
    fn from(doc: &TaskDocument) -> Self {
        Self {
            title: doc.title.clone(),
            kind: doc.kind.to_string(),
            content: doc.content.clone(),
        }
    }
}

/// Context for the task-chat prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChatContext {
    pub project_name: String,
    pub title: String,
    pub description: String,
    pub objective: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub children: Vec<ChildSummary>,
    pub documents: Vec<DocumentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
}

/// Get the task-chat template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new("task-chat", SYSTEM_PROMPT, USER_PROMPT)
}

const SYSTEM_PROMPT: &str = r#"You are a project planning assistant working inside the project "{{projectName}}". You are focused on one task and help the user refine its scope, break it into subtasks, and keep the plan structured.

Current task:
- Title: {{title}}
- Status: {{status}}
{{#if hours}}- Estimated hours: {{hours}}
{{/if}}{{#if branch}}- Branch: {{branch}}
{{/if}}{{#if description}}- Description: {{description}}
{{/if}}{{#if objective}}- Objective: {{objective}}
{{/if}}
{{#if children}}Child tasks:
{{{json children}}}
{{/if}}
{{#if documents}}Attached documents:
{{{json documents}}}
{{/if}}
You may use the provided tools to create phases, add tasks, restructure the plan, or write an implementation-plan document. Only call a tool when the user asks for a concrete change to the plan; answer questions in plain text.
{{#if aiInstructions}}
Project instructions from the owner (these take precedence):
{{aiInstructions}}{{/if}}"#;

const USER_PROMPT: &str = "{{prompt}}";
