//! OpenAI-compatible chat completions client.
//!
//! Works against any endpoint that implements `POST {base}/chat/completions`
//! with function calling, including Gemini's OpenAI compatibility layer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::mcp::ToolDescriptor;
use crate::Result;

use super::super::message::{Message, Role, ToolCallRequest};
use super::types::{ChatCompletionResponse, ResponseToolCall};
use super::{LlmClient, LlmResponse, Usage};

/// Chat completions client authenticated with a bearer API key.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    endpoint: Url,
    model: String,
    client: Client,
}

impl OpenAiClient {
    /// Create a client for `{base_url}/chat/completions`.
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)?.join("chat/completions")?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint,
            model: model.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Tool => json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id.as_deref().unwrap_or("unknown"),
                    "content": m.content,
                }),
                Role::Assistant if m.tool_calls.is_some() => {
                    let calls: Vec<Value> = m
                        .tool_calls
                        .iter()
                        .flatten()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    let content = if m.content.is_empty() {
                        Value::Null
                    } else {
                        Value::String(m.content.clone())
                    };
                    json!({"role": "assistant", "content": content, "tool_calls": calls})
                }
                role => json!({
                    "role": role_name(role),
                    "content": m.content,
                }),
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[ToolDescriptor]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    }
                })
            })
            .collect();

        Some(Value::Array(declarations))
    }

    fn parse_response(&self, response: ChatCompletionResponse) -> Result<LlmResponse> {
        let usage = response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("No choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, call)| parse_tool_call(i, call))
            .collect::<Result<Vec<_>>>()?;

        Ok(LlmResponse {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn parse_tool_call(index: usize, call: ResponseToolCall) -> Result<ToolCallRequest> {
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        json!({})
    } else {
        serde_json::from_str(raw).map_err(|e| {
            Error::Llm(format!(
                "Malformed arguments for tool {}: {}",
                call.function.name, e
            ))
        })?
    };

    Ok(ToolCallRequest {
        id: call
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("call_{index}")),
        name: call.function.name,
        arguments,
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> Result<LlmResponse> {
        let mut request = json!({
            "model": model,
            "messages": self.convert_messages(messages),
        });

        if let Some(tool_config) = self.convert_tools(tools) {
            request["tools"] = tool_config;
        }

        debug!("Calling {} with {} messages", model, messages.len());

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(Error::Llm(format!("API error ({}): {}", status, error_text.trim())));
        }

        let body = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Llm(format!("Malformed completion response: {}", e)))?;
        self.parse_response(parsed)
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new("test-key", &format!("{}/v1beta/openai", server.uri()), "gemini-2.0-flash", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_endpoint_join() {
        let client = OpenAiClient::new(
            "k",
            "https://generativelanguage.googleapis.com/v1beta/openai/",
            "m",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_convert_messages_tool_round_trip_shape() {
        let client = OpenAiClient::new("k", "http://localhost/", "m", Duration::from_secs(1)).unwrap();
        let call = ToolCallRequest {
            id: "call_0".to_string(),
            name: "search_products".to_string(),
            arguments: json!({"query": "shoes"}),
        };
        let wire = client.convert_messages(&[
            Message::system("sys"),
            Message::user("find shoes"),
            Message::assistant_with_tools("", vec![call]),
            Message::tool_result("call_0", "[]"),
        ]);

        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[2]["content"], Value::Null);
        assert_eq!(wire[2]["tool_calls"][0]["function"]["arguments"], "{\"query\":\"shoes\"}");
        assert_eq!(wire[3]["tool_call_id"], "call_0");
    }

    #[test]
    fn test_parse_tool_call_defaults() {
        let call: ResponseToolCall = serde_json::from_value(json!({
            "function": {"name": "ping", "arguments": ""}
        }))
        .unwrap();
        let parsed = parse_tool_call(2, call).unwrap();
        assert_eq!(parsed.id, "call_2");
        assert_eq!(parsed.arguments, json!({}));

        let bad: ResponseToolCall = serde_json::from_value(json!({
            "id": "x", "function": {"name": "ping", "arguments": "{oops"}
        }))
        .unwrap();
        assert!(parse_tool_call(0, bad).is_err());
    }

    #[tokio::test]
    async fn test_chat_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/openai/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "gemini-2.0-flash"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "We carry 3 hoodies."}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let resp = client
            .chat("gemini-2.0-flash", &[Message::user("hoodies?")], &[])
            .await
            .unwrap();
        assert_eq!(resp.content.as_deref(), Some("We carry 3 hoodies."));
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_chat_tool_call_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"tools": [{"type": "function", "function": {"name": "search_products"}}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{"id": "", "type": "function", "function": {"name": "search_products", "arguments": "{\"query\":\"hoodie\"}"}}]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let tools = vec![ToolDescriptor {
            name: "search_products".to_string(),
            description: "Search".to_string(),
            input_schema: json!({"type": "object"}),
        }];
        let client = client_for(&server);
        let resp = client
            .chat("gemini-2.0-flash", &[Message::user("hoodies?")], &tools)
            .await
            .unwrap();
        assert_eq!(resp.tool_calls.len(), 1);
        assert_eq!(resp.tool_calls[0].id, "call_0");
        assert_eq!(resp.tool_calls[0].arguments["query"], "hoodie");
    }

    #[tokio::test]
    async fn test_chat_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .chat("gemini-2.0-flash", &[Message::user("hi")], &[])
            .await
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_chat_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .chat("gemini-2.0-flash", &[Message::user("hi")], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Malformed completion response"));
    }
}
