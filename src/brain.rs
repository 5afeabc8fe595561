use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AgentConfig;
use crate::llm::LlmClient;
use crate::types::{PageContext, truncate_chars};

pub const COMPLETE_MARKER: &str = "TASK_COMPLETE";
pub const FAILED_MARKER: &str = "TASK_FAILED";

/// Everything the decision client sees for one step.
pub struct DecisionRequest<'a> {
    pub task: &'a str,
    pub step_count: usize,
    pub current_url: &'a str,
    pub context: &'a PageContext,
}

/// Produces one directive string per step. Never fails: a model fault
/// comes back as a `TASK_FAILED` directive, not an error.
#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn decide(&self, request: DecisionRequest<'_>) -> String;
}

/// The production decision client: builds the prompt, makes one
/// bounded, low-temperature model call, and applies the hard step
/// ceiling so the loop terminates even if the model never signals.
pub struct Brain {
    llm: Arc<dyn LlmClient>,
    config: AgentConfig,
}

impl Brain {
    pub fn new(llm: Arc<dyn LlmClient>, config: AgentConfig) -> Self {
        Self { llm, config }
    }

    fn build_prompt(&self, request: &DecisionRequest<'_>) -> String {
        let visible = truncate_chars(
            &request.context.visible_text,
            self.config.prompt_text_limit,
        );
        let shown = request
            .context
            .elements
            .iter()
            .take(self.config.prompt_element_limit)
            .collect::<Vec<_>>();
        let elements =
            serde_json::to_string_pretty(&shown).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"You are an AUTONOMOUS web agent. Your goal: "{task}"

Current step: {step}
URL: {url}

VISIBLE PAGE CONTENT:
{visible}

INTERACTIVE ELEMENTS FOUND:
{elements}

BE PROACTIVE! Think step-by-step:
1. What does the task require?
2. What information is visible on this page?
3. What action will help complete the task?
4. Should I scroll to see more content?
5. Should I click something to navigate?

AVAILABLE ACTIONS:
- CLICK button 'Text' - Click a button with specific text
- CLICK link 'Text' - Click a link with specific text
- FILL field_name value - Fill a form field
- SCROLL - Scroll down to see more content
- NAVIGATE url - Go to a specific URL
- SEARCH text - Look for specific text/content
- TASK_COMPLETE - Task is finished successfully
- TASK_FAILED - Cannot complete task

DECISION RULES:
- If task asks to "find" or "get" information: ACTIVELY look around the page, scroll if needed
- If you don't see what you need: SCROLL down to explore more
- If task involves courses/products: Look for navigation links, click relevant sections
- If task asks for specific content: Search the page thoroughly before giving up
- If you find relevant links: CLICK them to explore
- If page has limited content: SCROLL to see more
- Only say TASK_COMPLETE when you've actually found/done what was requested

EXAMPLES:
Task: "Get list of courses" -> SCROLL (to see more courses) or CLICK link 'View All Courses'
Task: "Find RAG course" -> SCROLL or CLICK link containing 'RAG' or 'Retrieval'
Task: "Subscribe to newsletter" -> Look for email field, FILL it, then CLICK subscribe

Choose the MOST HELPFUL action to progress toward completing: "{task}"
Be PROACTIVE and EXPLORATORY, not passive!"#,
            task = request.task,
            step = request.step_count,
            url = request.current_url,
            visible = visible,
            elements = elements,
        )
    }
}

#[async_trait]
impl DecisionEngine for Brain {
    async fn decide(&self, request: DecisionRequest<'_>) -> String {
        let prompt = self.build_prompt(&request);

        let reply = match self
            .llm
            .generate(
                &prompt,
                None,
                self.config.max_decision_tokens,
                self.config.temperature,
            )
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(error) => {
                tracing::warn!(%error, "decision call failed, converting to a failure directive");
                return FAILED_MARKER.to_string();
            }
        };

        // Circuit breaker: past the ceiling, a reply that signals
        // neither completion nor failure is overridden so the loop
        // cannot run unbounded on an indecisive model.
        if request.step_count >= self.config.decision_step_ceiling
            && !reply.contains(COMPLETE_MARKER)
            && !reply.contains(FAILED_MARKER)
        {
            tracing::info!(
                step = request.step_count,
                "step ceiling reached, forcing completion"
            );
            return COMPLETE_MARKER.to_string();
        }

        reply
    }
}
