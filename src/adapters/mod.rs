//! Adapters module: user-facing front ends.
//!
//! # Supported Channels
//!
//! - **CLI**: Interactive command line shopping session

pub mod cli;

pub use cli::{ask, run_chat, AskOutcome, ChatOutcome, CliChannel, LoopExit, LoopState, ToolServer};
