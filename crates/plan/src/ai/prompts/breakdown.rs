//! Estimation breakdown prompt template.
//!
//! Asks the model for a full project breakdown as strict JSON matching
//! the stored `EstimationBreakdown` shape.

use serde::Serialize;

use super::PromptTemplate;

/// Context for the breakdown prompt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownContext {
    pub project_name: String,
    /// Free-form project brief from the user
    pub brief: String,
    /// Existing phases and tasks, serialized for context
    pub existing_plan: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_instructions: Option<String>,
}

/// Get the breakdown template.
pub fn template() -> PromptTemplate {
    PromptTemplate::new("breakdown", SYSTEM_PROMPT, USER_PROMPT)
}

const SYSTEM_PROMPT: &str = r#"You are an experienced software estimator. Produce a complete work breakdown for the described project: phases, each with concrete tasks, hour estimates, and a complexity label.

IMPORTANT: Your response MUST be a single JSON object with exactly this structure and nothing else (no prose, no markdown fences):
{
  "phases": [
    {
      "name": "string",
      "tasks": [
        {"name": "string", "hours": 8.0, "complexity": "low|medium|high"}
      ]
    }
  ]
}

Rules:
1. Hours are numbers, not strings, and reflect effort for one developer.
2. Every task belongs to exactly one phase; phase names are unique.
3. Keep tasks small enough to estimate honestly (roughly 2-16 hours each).
4. Do not invent phases for work the brief does not ask for.
{{#if aiInstructions}}
Project instructions from the owner (these take precedence):
{{aiInstructions}}{{/if}}"#;

const USER_PROMPT: &str = r#"Project: {{projectName}}

Brief:
{{brief}}

{{#if existingPlan}}The project already has this plan; extend or refine it rather than duplicating it:
{{{json existingPlan}}}
{{/if}}
Return the breakdown JSON now."#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_breakdown_prompt_renders() {
        let ctx = BreakdownContext {
            project_name: "Widgets".to_string(),
            brief: "A REST API for widget inventory".to_string(),
            existing_plan: json!([{"title": "Setup"}]),
            ai_instructions: None,
        };

        let (system, user) = template().render(&ctx).unwrap();
        assert!(system.contains("\"phases\""));
        assert!(user.contains("widget inventory"));
        assert!(user.contains("\"title\": \"Setup\""));
    }
}
