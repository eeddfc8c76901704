//! Chat orchestration.
//!
//! Glues the task tree, prompt templates, backend selection and the tool
//! set together: one orchestrator instance serves the per-task chat, the
//! streaming variant, and breakdown generation.

use std::sync::Arc;

use serde::Serialize;

use crate::entities::{EstimationBreakdown, ProjectId, TaskId};
use crate::errors::{PlanError, PlanResult};
use crate::hierarchy::HierarchyManager;
use crate::store::PlanStore;

use super::prompts::{self, BreakdownContext, TaskChatContext};
use super::provider::{parse_ai_response, ChatMessage, GenerateOptions, TextStream};
use super::select::{get_model, ProviderCredentials};
use super::tools::ToolCall;

/// Outcome of one executed tool call, included in the chat reply.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolReport {
    pub tool: String,
    pub result: serde_json::Value,
}

/// A complete chat turn: the assistant text plus whatever the tools did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub text: String,
    pub tool_reports: Vec<ToolReport>,
    pub model: String,
    pub provider: String,
}

/// Per-task chat and estimation orchestrator.
#[derive(Clone)]
pub struct ChatOrchestrator {
    store: Arc<PlanStore>,
    hierarchy: HierarchyManager,
    creds: ProviderCredentials,
}

impl ChatOrchestrator {
    pub fn new(store: Arc<PlanStore>, creds: ProviderCredentials) -> Self {
        let hierarchy = HierarchyManager::new(store.clone());
        Self {
            store,
            hierarchy,
            creds,
        }
    }

    fn require_configured(&self) -> PlanResult<()> {
        if self.creds.is_configured() {
            Ok(())
        } else {
            Err(PlanError::ProviderNotConfigured)
        }
    }

    /// Build the system prompt for a task's chat from current state.
    pub fn system_prompt(&self, task_id: TaskId) -> PlanResult<String> {
        let task = self.store.get_task(task_id)?;
        let project = self.store.get_project(task.project_id)?;

        let context = TaskChatContext {
            project_name: project.name,
            title: task.title,
            description: task.description,
            objective: task.objective,
            status: task.status.to_string(),
            hours: task.hours,
            branch: task.branch,
            children: self
                .store
                .children_of(task_id)
                .iter()
                .map(Into::into)
                .collect(),
            documents: self
                .store
                .documents_of(task_id)
                .iter()
                .map(Into::into)
                .collect(),
            ai_instructions: project.ai_instructions,
        };

        let (system, _) = prompts::task_chat::template().render(&context)?;
        Ok(system)
    }

    /// One chat turn with tool calling.
    ///
    /// Tool calls run in the order the model emitted them; each result is
    /// reported back to the caller. A failing tool fails the whole turn so
    /// the client never sees a half-applied plan change presented as
    /// success.
    pub async fn respond(
        &self,
        task_id: TaskId,
        history: &[ChatMessage],
    ) -> PlanResult<ChatOutcome> {
        self.require_configured()?;
        let task = self.store.get_task(task_id)?;
        let project_id = task.project_id;

        let mut messages = vec![ChatMessage::system(self.system_prompt(task_id)?)];
        messages.extend_from_slice(history);

        let handle = get_model(&self.creds);
        tracing::info!(
            task_id = %task_id,
            backend = handle.backend.name(),
            model = %handle.model,
            "Chat turn"
        );

        let response = handle
            .provider
            .generate(
                &handle.model,
                &messages,
                &ToolCall::declarations(),
                &GenerateOptions::default(),
            )
            .await?;

        let mut tool_reports = Vec::with_capacity(response.tool_calls.len());
        for invocation in &response.tool_calls {
            let call = ToolCall::parse(invocation)?;
            let name = call.name();
            let result = call.execute(&self.hierarchy, project_id)?;
            tool_reports.push(ToolReport {
                tool: name.to_string(),
                result,
            });
        }

        Ok(ChatOutcome {
            text: response.text,
            tool_reports,
            model: response.model,
            provider: response.provider,
        })
    }

    /// Streaming chat turn. No tool calling on this path; the client gets
    /// raw text chunks.
    pub async fn stream_answer(
        &self,
        task_id: TaskId,
        history: &[ChatMessage],
    ) -> PlanResult<TextStream> {
        self.require_configured()?;

        let mut messages = vec![ChatMessage::system(self.system_prompt(task_id)?)];
        messages.extend_from_slice(history);

        let handle = get_model(&self.creds);
        tracing::info!(
            task_id = %task_id,
            backend = handle.backend.name(),
            model = %handle.model,
            "Chat stream"
        );

        handle
            .provider
            .stream(&handle.model, &messages, &GenerateOptions::default())
            .await
    }

    /// Generate a work breakdown for a project brief.
    ///
    /// Returns the parsed breakdown only; recording it as an estimation
    /// (and metering it) is the caller's business.
    pub async fn generate_breakdown(
        &self,
        project_id: ProjectId,
        brief: &str,
    ) -> PlanResult<EstimationBreakdown> {
        self.require_configured()?;
        let project = self.store.get_project(project_id)?;

        let existing_plan = self.existing_plan(project_id);
        let context = BreakdownContext {
            project_name: project.name,
            brief: brief.to_string(),
            existing_plan,
            ai_instructions: project.ai_instructions,
        };
        let (system, user) = prompts::breakdown::template().render(&context)?;

        let handle = get_model(&self.creds);
        tracing::info!(
            project_id = %project_id,
            backend = handle.backend.name(),
            "Generating breakdown"
        );

        let response = handle
            .provider
            .generate(
                &handle.model,
                &[ChatMessage::system(system), ChatMessage::user(user)],
                &[],
                &GenerateOptions::default(),
            )
            .await?;

        parse_ai_response(&response)
    }

    /// Current plan as a compact JSON outline for prompt context.
    fn existing_plan(&self, project_id: ProjectId) -> serde_json::Value {
        let phases: Vec<serde_json::Value> = self
            .store
            .roots_of(project_id)
            .iter()
            .map(|phase| {
                let tasks: Vec<serde_json::Value> = self
                    .store
                    .children_of(phase.id)
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "title": t.title,
                            "status": t.status.to_string(),
                            "hours": t.hours,
                        })
                    })
                    .collect();
                serde_json::json!({"title": phase.title, "tasks": tasks})
            })
            .collect();
        serde_json::Value::Array(phases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Project, Task, User};
    use crate::hierarchy::NewTask;
    use futures::StreamExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn seeded_store() -> (Arc<PlanStore>, ProjectId, Task) {
        let store = Arc::new(PlanStore::new());
        let user = User::new("dev@example.com");
        let mut project = Project::new(user.id, "Widgets");
        project.ai_instructions = Some("Prefer small tasks.".to_string());
        let project_id = project.id;
        store.insert_user(user);
        store.insert_project(project);

        let hierarchy = HierarchyManager::new(store.clone());
        let task = hierarchy
            .create_task(NewTask::new(project_id, None, "Build API"))
            .unwrap();
        (store, project_id, task)
    }

    fn mock_creds(server: &MockServer) -> ProviderCredentials {
        ProviderCredentials {
            openai_api_key: Some("test-key".to_string()),
            openai_base_url: Some(server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unconfigured_short_circuits() {
        let (store, _, task) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store, ProviderCredentials::default());

        let result = orchestrator
            .respond(task.id, &[ChatMessage::user("hi")])
            .await;
        assert!(matches!(result, Err(PlanError::ProviderNotConfigured)));
    }

    #[tokio::test]
    async fn test_system_prompt_reflects_state() {
        let (store, _, task) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store, ProviderCredentials::default());

        let system = orchestrator.system_prompt(task.id).unwrap();
        assert!(system.contains("Build API"));
        assert!(system.contains("Widgets"));
        assert!(system.contains("Prefer small tasks."));
    }

    #[tokio::test]
    async fn test_respond_executes_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": "Created the phase.",
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "create_phase",
                                "arguments": "{\"title\":\"Backend\",\"description\":\"API work\"}"
                            }
                        }]
                    }
                }],
                "model": "gpt-4o-mini"
            })))
            .mount(&server)
            .await;

        let (store, project_id, task) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store.clone(), mock_creds(&server));

        let outcome = orchestrator
            .respond(task.id, &[ChatMessage::user("add a backend phase")])
            .await
            .unwrap();

        assert_eq!(outcome.text, "Created the phase.");
        assert_eq!(outcome.tool_reports.len(), 1);
        assert_eq!(outcome.tool_reports[0].tool, "create_phase");

        let roots = store.roots_of(project_id);
        assert!(roots.iter().any(|t| t.title == "Backend"));
    }

    #[tokio::test]
    async fn test_respond_rejects_unknown_tool() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "rm_rf", "arguments": "{}"}
                        }]
                    }
                }],
                "model": "gpt-4o-mini"
            })))
            .mount(&server)
            .await;

        let (store, _, task) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store, mock_creds(&server));

        let err = orchestrator
            .respond(task.id, &[ChatMessage::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownTool { name } if name == "rm_rf"));
    }

    #[tokio::test]
    async fn test_stream_answer_yields_chunks() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body),
            )
            .mount(&server)
            .await;

        let (store, _, task) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store, mock_creds(&server));

        let mut stream = orchestrator
            .stream_answer(task.id, &[ChatMessage::user("hi")])
            .await
            .unwrap();

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk.unwrap());
        }
        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn test_generate_breakdown_parses_json() {
        let server = MockServer::start().await;
        let breakdown_json = serde_json::json!({
            "phases": [{
                "name": "Backend",
                "tasks": [{"name": "API", "hours": 8.0, "complexity": "medium"}]
            }]
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": breakdown_json.to_string()}
                }],
                "model": "gpt-4o-mini"
            })))
            .mount(&server)
            .await;

        let (store, project_id, _) = seeded_store();
        let orchestrator = ChatOrchestrator::new(store, mock_creds(&server));

        let breakdown = orchestrator
            .generate_breakdown(project_id, "A widget API")
            .await
            .unwrap();

        assert_eq!(breakdown.phases.len(), 1);
        assert!((breakdown.total_hours() - 8.0).abs() < f64::EPSILON);
    }
}
