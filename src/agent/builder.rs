//! Per-turn agent configuration.
//!
//! A fresh [`AgentConfig`] is built for every turn from the base
//! instructions and the current history snapshot. Building is a pure
//! string transform: same inputs, same bytes.

use std::fmt;
use std::fmt::Write as _;

use super::history::{ConversationTurn, HISTORY_CAPACITY};
use crate::mcp::ToolHost;

/// Name the assistant runs under.
pub const AGENT_NAME: &str = "ShopkeepAssistant";

/// Everything the runner needs for one turn. Borrows the tool host.
#[derive(Clone)]
pub struct AgentConfig<'a> {
    pub name: String,
    pub instructions: String,
    pub tools: &'a dyn ToolHost,
    pub model: String,
}

impl fmt::Debug for AgentConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("name", &self.name)
            .field("instructions", &self.instructions)
            .field("tools", &self.tools.tools().len())
            .field("model", &self.model)
            .finish()
    }
}

/// Combine base instructions, history and tool access into a config.
pub fn build<'a>(
    base_instructions: &str,
    history: &[ConversationTurn],
    tools: &'a dyn ToolHost,
    model: &str,
) -> AgentConfig<'a> {
    AgentConfig {
        name: AGENT_NAME.to_string(),
        instructions: instructions_with_history(base_instructions, history),
        tools,
        model: model.to_string(),
    }
}

/// Append a numbered rendering of `history` (oldest first) to `base`.
///
/// Returns `base` unchanged when there is no history.
pub fn instructions_with_history(base: &str, history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return base.to_string();
    }

    let mut text = String::with_capacity(base.len() + history.len() * 64);
    text.push_str(base);
    let _ = write!(
        text,
        "\n\n**Recent Conversation History (Last {} messages):**\n",
        HISTORY_CAPACITY
    );
    for (i, turn) in history.iter().enumerate() {
        let _ = writeln!(text, "{}. {}", i + 1, turn);
    }
    text
}
