//! Shopkeep - interactive shopping assistant
//!
//! This library provides the turn orchestration for a command-line assistant
//! that answers product questions using a store's MCP tool server and an
//! OpenAI-compatible completion API.

pub mod adapters;
pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod prompts;
pub mod ui;

pub use error::{Error, Result, SetupError, TurnError};
