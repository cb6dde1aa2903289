//! MCP tool session: the connection to the store's tool server.
//!
//! The store exposes its product tools over the MCP Streamable HTTP
//! transport. The protocol itself is handled by `rmcp`; this module wraps
//! it in the shape the agent needs:
//!
//! - [`McpSession`]: open / list tools / call tool / close
//! - [`ToolHost`]: the view of a session the agent runner is given
//! - [`ToolDescriptor`]: a discovered tool (name, description, schema)

mod session;
#[cfg(test)]
pub(crate) mod stub;

pub use session::{McpSession, ServerInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::Result;

/// Protocol revisions this client knows how to talk.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// A tool advertised by the server in `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Something that can run tools on behalf of the model.
///
/// The agent only borrows a host for the duration of a turn; it never
/// opens or closes one.
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Tools available in this session, in server order.
    fn tools(&self) -> &[ToolDescriptor];

    /// Invoke a tool and return its textual result.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String>;

    /// Check if a tool exists
    fn has_tool(&self, name: &str) -> bool {
        self.tools().iter().any(|t| t.name == name)
    }
}

/// In-memory tool host for testing.
#[cfg(test)]
pub struct FakeToolHost {
    tools: Vec<ToolDescriptor>,
    results: std::collections::HashMap<String, std::result::Result<String, String>>,
    calls: std::sync::Mutex<Vec<(String, Value)>>,
}

#[cfg(test)]
impl FakeToolHost {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            results: std::collections::HashMap::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register a tool that answers every call with `result`.
    pub fn with_tool(mut self, name: &str, result: &str) -> Self {
        self.tools.push(ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} for testing"),
            input_schema: empty_object_schema(),
        });
        self.results.insert(name.to_string(), Ok(result.to_string()));
        self
    }

    /// Register a tool whose every call fails.
    pub fn with_failing_tool(mut self, name: &str, message: &str) -> Self {
        self.tools.push(ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} for testing"),
            input_schema: empty_object_schema(),
        });
        self.results
            .insert(name.to_string(), Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ToolHost for FakeToolHost {
    fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        match self.results.get(name) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(crate::Error::Tool(message.clone())),
            None => Err(crate::Error::Tool(format!("Unknown tool: {name}"))),
        }
    }
}
