//! Prompt templates for chat and estimation.
//!
//! Handlebars-based templates with HTML escaping disabled; a `json`
//! helper pretty-prints context values straight into the prompt body.

use handlebars::Handlebars;
use serde::Serialize;

use crate::errors::{PlanError, PlanResult};

pub mod breakdown;
pub mod task_chat;

pub use breakdown::BreakdownContext;
pub use task_chat::{ChildSummary, DocumentSummary, TaskChatContext};

/// A prompt template with system and user messages.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Template ID
    pub id: String,
    /// System prompt template
    pub system: String,
    /// User prompt template
    pub user: String,
}

impl PromptTemplate {
    pub fn new(id: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            system: system.into(),
            user: user.into(),
        }
    }

    /// Render the template with the given context.
    pub fn render<T: Serialize>(&self, context: &T) -> PlanResult<(String, String)> {
        let mut handlebars = create_handlebars();

        handlebars
            .register_template_string("system", &self.system)
            .map_err(|e| PlanError::Ai(format!("Invalid system template: {e}")))?;
        handlebars
            .register_template_string("user", &self.user)
            .map_err(|e| PlanError::Ai(format!("Invalid user template: {e}")))?;

        let system = handlebars
            .render("system", context)
            .map_err(|e| PlanError::Ai(format!("Failed to render system prompt: {e}")))?;
        let user = handlebars
            .render("user", context)
            .map_err(|e| PlanError::Ai(format!("Failed to render user prompt: {e}")))?;

        Ok((system, user))
    }
}

/// Create a Handlebars instance with custom helpers.
fn create_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    // Helper: {{{json value}}}
    handlebars.register_helper(
        "json",
        Box::new(
            |h: &handlebars::Helper,
             _: &Handlebars,
             _: &handlebars::Context,
             _: &mut handlebars::RenderContext,
             out: &mut dyn handlebars::Output| {
                if let Some(param) = h.param(0) {
                    let json = serde_json::to_string_pretty(param.value())
                        .unwrap_or_else(|_| "null".to_string());
                    out.write(&json)?;
                }
                Ok(())
            },
        ),
    );

    handlebars
}
