//! OpenAI-compatible agent runtime.
//!
//! Runs chat completions with the session's tools exposed as functions,
//! executing requested tool calls until the model answers in plain text.
//! The full message list is returned as `{"history": [...]}`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::{AgentError, AgentOutput, AgentRuntime, ChatAgent};
use crate::config::AgentConfig;
use crate::tools::{ToolDefinition, ToolError};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Value,
}

#[derive(Debug, Deserialize)]
struct RequestedCall {
    id: String,
    function: RequestedFunction,
}

#[derive(Debug, Deserialize)]
struct RequestedFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Agent runtime backed by an OpenAI-compatible `/chat/completions` API.
#[derive(Debug, Clone)]
pub struct OpenAiAgent {
    client: reqwest::Client,
    config: AgentConfig,
}

impl OpenAiAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: AgentConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }

    async fn complete(&self, messages: &[Value], tools: &[Value], user: &str) -> Result<Value, AgentError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
            "user": user,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::Api(format!("{}: {}", status, text)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::InvalidResponse("no choices returned".into()))
    }
}

fn function_spec(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description.clone().unwrap_or_default(),
            "parameters": tool.input_schema,
        }
    })
}

/// Flatten MCP content into the string a `tool` message expects.
fn tool_content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if texts.len() == parts.len() && !texts.is_empty() {
                texts.join("\n")
            } else {
                content.to_string()
            }
        }
        other => other.to_string(),
    }
}

#[async_trait]
impl AgentRuntime for OpenAiAgent {
    async fn invoke(
        &self,
        agent: &ChatAgent<'_>,
        message: &str,
        session_id: &str,
    ) -> Result<AgentOutput, AgentError> {
        let tools: Vec<Value> = agent.tools.tools().iter().map(function_spec).collect();
        let mut history = vec![
            json!({"role": "system", "content": agent.instruction}),
            json!({"role": "user", "content": message}),
        ];

        for round in 0..self.config.max_tool_rounds {
            let reply = self.complete(&history, &tools, session_id).await?;
            history.push(reply.clone());

            let calls: Vec<RequestedCall> = match reply.get("tool_calls") {
                Some(Value::Array(_)) => serde_json::from_value(reply["tool_calls"].clone())
                    .map_err(|e| AgentError::InvalidResponse(format!("tool_calls: {}", e)))?,
                _ => Vec::new(),
            };

            if calls.is_empty() {
                let text = reply
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tracing::debug!(agent = agent.name, rounds = round + 1, "Agent produced final answer");
                return Ok(AgentOutput {
                    text,
                    raw: json!({"history": history}),
                });
            }

            for call in calls {
                let arguments: Value = if call.function.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        AgentError::InvalidResponse(format!("arguments for {}: {}", call.function.name, e))
                    })?
                };

                tracing::info!(agent = agent.name, tool = %call.function.name, "Invoking tool");
                let content = match agent.tools.call_tool(&call.function.name, arguments).await {
                    Ok(content) => tool_content_text(&content),
                    // Let the model see server-side tool errors and recover.
                    Err(ToolError::Remote { code, message }) => {
                        format!("Tool error {}: {}", code, message)
                    }
                    Err(e) => return Err(AgentError::Tool(e)),
                };

                history.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": content,
                }));
            }
        }

        Err(AgentError::ToolRoundsExceeded(self.config.max_tool_rounds))
    }
}
