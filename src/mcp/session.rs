//! MCP session lifecycle: open, list tools, call tools, close.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::{
    RoleClient,
    model::{CallToolRequestParam, PaginatedRequestParam, RawContent, ResourceContents},
    service::{RunningService, ServiceError, ServiceExt},
    transport::StreamableHttpClientTransport,
};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use super::{ToolDescriptor, ToolHost, SUPPORTED_PROTOCOL_VERSIONS};
use crate::error::{Error, SetupError};
use crate::Result;

/// Upper bound on `tools/list` pages, in case a server keeps handing out cursors.
const MAX_TOOL_PAGES: usize = 64;

type StoreService = RunningService<RoleClient, ()>;

/// Identity the server reported in its `initialize` result.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

/// Map rmcp service errors, keeping JSON-RPC error codes readable.
fn map_service_error(e: ServiceError, context: &str) -> Error {
    match e {
        ServiceError::McpError(data) => {
            Error::Mcp(format!("{context}: {} (code {})", data.message, data.code.0))
        }
        other => Error::Mcp(format!("{context}: {other}")),
    }
}

fn render_content(raw: &RawContent) -> String {
    match raw {
        RawContent::Text(t) => t.text.clone(),
        RawContent::Image(i) => format!("[image: {}]", i.mime_type),
        RawContent::Audio(a) => format!("[audio: {}]", a.mime_type),
        RawContent::Resource(r) => match &r.resource {
            ResourceContents::TextResourceContents { text, .. } => text.clone(),
            ResourceContents::BlobResourceContents { uri, .. } => format!("[resource: {uri}]"),
        },
        RawContent::ResourceLink(r) => format!("[resource: {}]", r.uri),
    }
}

/// An open session with the store's MCP server.
///
/// Created once per run by [`McpSession::open`]; must be released with
/// [`McpSession::close`] on every exit path. Closing twice is harmless.
pub struct McpSession {
    name: String,
    endpoint: Url,
    timeout: Duration,
    service: Option<StoreService>,
    server_info: ServerInfo,
    tools: Vec<ToolDescriptor>,
}

impl McpSession {
    /// Connect and run the `initialize` handshake.
    pub async fn open(
        name: impl Into<String>,
        endpoint: Url,
        timeout_after: Duration,
    ) -> std::result::Result<Self, SetupError> {
        let name = name.into();
        let setup_err = |message: String| SetupError::Open {
            endpoint: endpoint.to_string(),
            source: Error::Mcp(message),
        };

        let transport = StreamableHttpClientTransport::from_uri(endpoint.as_str());
        let service: StoreService = timeout(timeout_after, ().serve(transport))
            .await
            .map_err(|_| setup_err(format!("initialize timed out after {timeout_after:?}")))?
            .map_err(|e| setup_err(format!("initialize failed: {e}")))?;

        let mut server_info = ServerInfo::default();
        if let Some(info) = service.peer_info() {
            let protocol_version = info.protocol_version.to_string();
            if !SUPPORTED_PROTOCOL_VERSIONS.contains(&protocol_version.as_str()) {
                warn!(
                    session = %name,
                    server_version = %protocol_version,
                    supported = ?SUPPORTED_PROTOCOL_VERSIONS,
                    "MCP protocol version mismatch"
                );
            }
            server_info = ServerInfo {
                name: info.server_info.name.to_string(),
                version: info.server_info.version.to_string(),
                protocol_version,
            };
        }

        info!(session = %name, server = %server_info.name, "MCP session opened");
        Ok(Self {
            name,
            endpoint,
            timeout: timeout_after,
            service: Some(service),
            server_info,
            tools: Vec::new(),
        })
    }

    fn service(&self) -> Result<&StoreService> {
        self.service
            .as_ref()
            .ok_or_else(|| Error::Mcp("session is closed".to_string()))
    }

    /// Discover the server's tools, following pagination cursors.
    pub async fn list_tools(&mut self) -> std::result::Result<&[ToolDescriptor], SetupError> {
        let list_err = |source: Error| SetupError::ListTools { source };
        let service = self.service().map_err(list_err)?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_TOOL_PAGES {
            let params = cursor.take().map(|c| PaginatedRequestParam { cursor: Some(c) });
            let result = timeout(self.timeout, service.list_tools(params))
                .await
                .map_err(|_| list_err(Error::Mcp(format!("tools/list timed out after {:?}", self.timeout))))?
                .map_err(|e| list_err(map_service_error(e, "Failed to list tools")))?;

            tools.extend(result.tools.into_iter().map(|t| ToolDescriptor {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema: Value::Object((*t.input_schema).clone()),
            }));

            match result.next_cursor {
                Some(next) if !next.is_empty() => {
                    debug!("tools/list page {} has a next cursor", page + 1);
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        if cursor.is_some() {
            return Err(list_err(Error::Mcp(format!(
                "tools/list still paginating after {MAX_TOOL_PAGES} pages"
            ))));
        }

        debug!("Discovered {} tools", tools.len());
        self.tools = tools;
        Ok(&self.tools)
    }

    /// Release the session. Errors are logged, never returned.
    pub async fn close(&mut self) {
        let Some(service) = self.service.take() else {
            return;
        };

        match timeout(self.timeout, service.cancel()).await {
            Ok(Ok(reason)) => info!(session = %self.name, "MCP session closed: {:?}", reason),
            Ok(Err(e)) => warn!(session = %self.name, "Failed to close MCP session: {}", e),
            Err(_) => warn!(session = %self.name, "Timed out closing MCP session"),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn is_closed(&self) -> bool {
        self.service.is_none()
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        if self.service.is_some() {
            warn!(session = %self.name, "MCP session dropped without close");
        }
    }
}

#[async_trait]
impl ToolHost for McpSession {
    fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        let service = self.service()?;
        if !self.has_tool(name) {
            return Err(Error::Tool(format!("Unknown tool: {name}")));
        }

        let result = timeout(
            self.timeout,
            service.call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: arguments.as_object().cloned(),
            }),
        )
        .await
        .map_err(|_| Error::Tool(format!("{name}: timed out after {:?}", self.timeout)))?
        .map_err(|e| map_service_error(e, "Tool call failed"))?;

        let mut text = result
            .content
            .iter()
            .map(|c| render_content(&c.raw))
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            if let Some(structured) = result.structured_content {
                text = structured.to_string();
            }
        }

        if result.is_error.unwrap_or(false) {
            return Err(Error::Tool(format!("{name}: {text}")));
        }
        Ok(text)
    }
}
