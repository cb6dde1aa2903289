//! Error types for Shopkeep

use thiserror::Error;

/// Result type alias for Shopkeep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Shopkeep
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Max iterations reached")]
    MaxIterations,
}

/// Failure to bring up the tool session. Fatal: the chat loop never starts.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("could not open tool session at {endpoint}: {source}")]
    Open {
        endpoint: String,
        #[source]
        source: Error,
    },

    #[error("could not list tools: {source}")]
    ListTools {
        #[source]
        source: Error,
    },

    #[error("interrupted before the tool session was ready")]
    Interrupted,
}

/// Failure of a single turn. Reported to the user; the loop keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct TurnError {
    cause: String,
}

impl TurnError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }

    pub fn cause(&self) -> &str {
        &self.cause
    }
}

impl From<Error> for TurnError {
    fn from(err: Error) -> Self {
        Self::new(err.to_string())
    }
}
