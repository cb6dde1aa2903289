//! Wiremock stand-in for a store's MCP endpoint.

use std::time::Duration;

use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub(crate) const SESSION_ID: &str = "store-session-1";

/// Answers a JSON-RPC request with `result`, echoing the request id.
pub(crate) struct RpcReply {
    result: Value,
    delay: Option<Duration>,
}

impl RpcReply {
    pub(crate) fn new(result: Value) -> Self {
        Self { result, delay: None }
    }

    pub(crate) fn delayed(result: Value, delay: Duration) -> Self {
        Self { result, delay: Some(delay) }
    }
}

impl Respond for RpcReply {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|body| body.get("id").cloned())
            .unwrap_or(Value::Null);

        let reply = ResponseTemplate::new(200)
            .insert_header("mcp-session-id", SESSION_ID)
            .set_body_json(json!({"jsonrpc": "2.0", "id": id, "result": self.result}));
        match self.delay {
            Some(delay) => reply.set_delay(delay),
            None => reply,
        }
    }
}

pub(crate) fn endpoint(server: &MockServer) -> Url {
    Url::parse(&format!("{}/api/mcp", server.uri())).unwrap()
}

pub(crate) fn tools_result(names: &[&str]) -> Value {
    let tools: Vec<Value> = names
        .iter()
        .map(|name| json!({"name": name, "description": format!("{name} tool"), "inputSchema": {"type": "object"}}))
        .collect();
    json!({ "tools": tools })
}

/// Mount `initialize`, notification acks, the optional GET stream (refused)
/// and session DELETE.
pub(crate) async fn mount_handshake(server: &MockServer) {
    mount_method(
        server,
        "initialize",
        RpcReply::new(json!({
            "protocolVersion": "2025-03-26",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "store", "version": "1.0.0"}
        })),
    )
    .await;

    // Notifications and anything else unmatched.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .with_priority(10)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(405))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

pub(crate) async fn mount_method(server: &MockServer, rpc_method: &str, reply: impl Respond + 'static) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": rpc_method})))
        .respond_with(reply)
        .mount(server)
        .await;
}

/// Count received JSON-RPC calls of `rpc_method`.
pub(crate) async fn rpc_calls(server: &MockServer, rpc_method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "POST")
        .filter_map(|r| serde_json::from_slice::<Value>(&r.body).ok())
        .filter(|body| body["method"] == rpc_method)
        .count()
}

async fn deletes(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "DELETE")
        .count()
}

/// Wait until the client has sent `expected` session DELETEs.
pub(crate) async fn wait_for_deletes(server: &MockServer, expected: usize) -> usize {
    for _ in 0..100 {
        let seen = deletes(server).await;
        if seen >= expected {
            return seen;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    deletes(server).await
}

/// Resolves once the server has seen a call of `rpc_method`.
pub(crate) async fn seen(server: &MockServer, rpc_method: &str) {
    while rpc_calls(server, rpc_method).await == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
