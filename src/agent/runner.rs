//! Agent runner - drives one turn through the model and the tool session

use tracing::{debug, info};
use crate::Result;
use crate::error::Error;
use super::builder::AgentConfig;
use super::llm::{LlmClient, Usage};
use super::message::{Message, ToolCallRequest};

/// What the model finally said, plus the tokens the whole turn spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// The runner resolves a query by alternating model calls and tool calls
/// until the model answers in plain text.
pub struct AgentRunner<C: LlmClient> {
    client: C,
    max_iterations: usize,
}

impl<C: LlmClient> AgentRunner<C> {
    /// Create a new runner
    pub fn new(client: C, max_iterations: usize) -> Self {
        Self {
            client,
            max_iterations,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run a single turn and return the final text
    pub async fn run(&self, agent: &AgentConfig<'_>, query: &str) -> Result<Completion> {
        let mut messages = vec![
            Message::system(agent.instructions.as_str()),
            Message::user(query),
        ];
        let tools = agent.tools.tools();
        let model = if agent.model.is_empty() {
            self.client.default_model()
        } else {
            agent.model.as_str()
        };

        info!(agent = %agent.name, "Starting turn with {} tools", tools.len());
        let mut usage = Usage::default();

        for iteration in 0..self.max_iterations {
            debug!("Iteration {}/{}", iteration + 1, self.max_iterations);

            let response = self.client.chat(model, &messages, tools).await?;
            usage += &response.usage;
            debug!(
                finish_reason = %response.finish_reason,
                prompt_tokens = response.usage.prompt_tokens,
                completion_tokens = response.usage.completion_tokens,
                "Model responded"
            );

            if !response.has_tool_calls() {
                let text = response.content.unwrap_or_default();
                info!(total_tokens = usage.total_tokens, "Turn completed with response: {} chars", text.len());
                return Ok(Completion { text, usage });
            }

            messages.push(Message::assistant_with_tools(
                response.content.clone().unwrap_or_default(),
                response.tool_calls.clone(),
            ));

            for tool_call in &response.tool_calls {
                let result = self.execute_tool(agent, tool_call).await;
                messages.push(Message::tool_result(&tool_call.id, result));
            }
        }

        Err(Error::MaxIterations)
    }

    /// Tool failures are handed back to the model as text so it can recover.
    async fn execute_tool(&self, agent: &AgentConfig<'_>, tool_call: &ToolCallRequest) -> String {
        debug!("Executing tool: {} with args: {}", tool_call.name, tool_call.arguments);

        match agent.tools.call_tool(&tool_call.name, tool_call.arguments.clone()).await {
            Ok(result) => {
                debug!("Tool {} succeeded: {} chars", tool_call.name, result.len());
                result
            }
            Err(e) => {
                let error_msg = format!("Error: {}", e);
                debug!("Tool {} failed: {}", tool_call.name, error_msg);
                error_msg
            }
        }
    }
}
