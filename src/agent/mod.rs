//! Agent module: core turn orchestration.
//!
//! This module contains:
//! - Message types for the completion API
//! - The bounded history window carried across turns
//! - The per-turn agent config builder
//! - LLM client trait and implementations
//! - The runner (model/tool loop) and the turn executor around it

pub mod builder;
mod executor;
pub mod history;
mod message;
mod runner;

// LLM providers in submodule
pub mod llm;

// Re-exports for convenience
pub use builder::{AgentConfig, AGENT_NAME};
pub use executor::{TurnExecutor, TurnResult};
pub use history::{ConversationTurn, HistoryWindow, HISTORY_CAPACITY};
pub use llm::{LlmClient, LlmResponse, OpenAiClient, Usage};
pub use message::{Message, Role, ToolCallRequest};
pub use runner::{AgentRunner, Completion};
