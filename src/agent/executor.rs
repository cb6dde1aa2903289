//! Turn executor - runs one turn and classifies its failure

use tracing::debug;

use crate::error::TurnError;
use super::builder::AgentConfig;
use super::llm::{LlmClient, Usage};
use super::runner::AgentRunner;

/// Final output of a successful turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub final_text: String,
    pub usage: Usage,
}

/// Hands a query and its agent config to the runner.
///
/// Whatever goes wrong inside the runner comes back as a [`TurnError`];
/// nothing here is fatal to the session.
pub struct TurnExecutor<C: LlmClient> {
    runner: AgentRunner<C>,
}

impl<C: LlmClient> TurnExecutor<C> {
    pub fn new(runner: AgentRunner<C>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &AgentRunner<C> {
        &self.runner
    }

    pub async fn run(&self, agent: &AgentConfig<'_>, query: &str) -> Result<TurnResult, TurnError> {
        if query.trim().is_empty() {
            return Err(TurnError::new("query is empty"));
        }

        match self.runner.run(agent, query).await {
            Ok(completion) => Ok(TurnResult {
                final_text: completion.text,
                usage: completion.usage,
            }),
            Err(e) => {
                debug!("Turn failed: {}", e);
                Err(TurnError::from(e))
            }
        }
    }
}
