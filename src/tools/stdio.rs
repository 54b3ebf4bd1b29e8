//! Subprocess-backed tool server connection.
//!
//! # Responsibilities
//! - Validate the tool server target before spawning anything
//! - Spawn the MCP server process and speak newline-delimited JSON-RPC 2.0
//! - Handshake (`initialize`, `notifications/initialized`, `tools/list`)
//! - Serve `tools/call` for the agent
//!
//! # Design Decisions
//! - One request in flight per session; the channel sits behind an async mutex
//! - The child is spawned with `kill_on_drop`, so dropping the session on any
//!   exit path (success, error, deadline) terminates the process

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use url::Url;

use crate::config::ToolServerConfig;
use crate::tools::{ToolConnector, ToolDefinition, ToolError, ToolSession};

const PROTOCOL_VERSION: &str = "2024-11-05";

type Reader = Box<dyn AsyncBufRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

/// JSON-RPC framing over a byte stream pair.
struct RpcChannel {
    writer: Writer,
    lines: Lines<Reader>,
    next_id: u64,
    // Held so the process lives exactly as long as the channel.
    _child: Option<Child>,
}

impl RpcChannel {
    fn new(writer: Writer, reader: Reader, child: Option<Child>) -> Self {
        Self {
            writer,
            lines: reader.lines(),
            next_id: 1,
            _child: child,
        }
    }

    async fn send(&mut self, message: &Value) -> Result<(), ToolError> {
        let mut frame = serde_json::to_vec(message).map_err(|e| ToolError::Protocol(e.to_string()))?;
        frame.push(b'\n');
        self.writer
            .write_all(&frame)
            .await
            .map_err(|e| ToolError::Io(e.to_string()))?;
        self.writer.flush().await.map_err(|e| ToolError::Io(e.to_string()))
    }

    async fn notify(&mut self, method: &str) -> Result<(), ToolError> {
        self.send(&json!({"jsonrpc": "2.0", "method": method})).await
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await?;

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| ToolError::Io(e.to_string()))?
                .ok_or(ToolError::Closed)?;
            if line.trim().is_empty() {
                continue;
            }

            let message: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(_) => {
                    tracing::debug!(line = %line, "Ignoring non-JSON output from tool server");
                    continue;
                }
            };

            // Notifications and responses to other ids are skipped.
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }

            if let Some(err) = message.get("error") {
                return Err(ToolError::Remote {
                    code: err.get("code").and_then(Value::as_i64).unwrap_or(0),
                    message: err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                });
            }
            return Ok(message.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}

/// An initialized MCP session.
pub struct StdioSession {
    name: String,
    tools: Vec<ToolDefinition>,
    channel: Mutex<RpcChannel>,
}

impl StdioSession {
    async fn handshake(name: String, mut channel: RpcChannel) -> Result<Self, ToolError> {
        let info = channel
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")},
                }),
            )
            .await?;
        channel.notify("notifications/initialized").await?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => json!({"cursor": c}),
                None => json!({}),
            };
            let page = channel.request("tools/list", params).await?;
            let batch: Vec<ToolDefinition> = serde_json::from_value(
                page.get("tools").cloned().unwrap_or_else(|| json!([])),
            )
            .map_err(|e| ToolError::Protocol(format!("invalid tools/list result: {}", e)))?;
            tools.extend(batch);

            cursor = page.get("nextCursor").and_then(Value::as_str).map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        let server_info = info.get("serverInfo").cloned().unwrap_or_default();
        tracing::info!(
            server = %name,
            server_info = %server_info,
            tool_count = tools.len(),
            "Tool server session initialized"
        );

        Ok(Self {
            name,
            tools,
            channel: Mutex::new(channel),
        })
    }
}

#[async_trait]
impl ToolSession for StdioSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let mut channel = self.channel.lock().await;
        let result = channel
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;

        if result.get("isError").and_then(Value::as_bool).unwrap_or(false) {
            tracing::warn!(tool = %name, "Tool reported an error result");
        }
        Ok(result.get("content").cloned().unwrap_or(result))
    }
}

/// Validate the URL handed to the tool server process.
pub fn validate_server_url(raw: &str) -> Result<Url, ToolError> {
    let url = Url::parse(raw)
        .map_err(|e| ToolError::InvalidConfig(format!("invalid server URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ToolError::InvalidConfig(format!(
            "invalid server URL '{}': unsupported scheme '{}'",
            raw, other
        ))),
    }
}

/// Spawns the configured MCP server as a child process.
#[derive(Debug, Clone, Default)]
pub struct StdioConnector;

impl StdioConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolConnector for StdioConnector {
    async fn connect(&self, config: &ToolServerConfig) -> Result<Box<dyn ToolSession>, ToolError> {
        let url = validate_server_url(&config.server_url)?;

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .env(&config.url_env_var, url.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Spawn(format!("{}: {}", config.command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Spawn("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Spawn("child stdout unavailable".into()))?;

        tracing::debug!(command = %config.command, pid = ?child.id(), "Tool server process spawned");

        let channel = RpcChannel::new(Box::new(stdin), Box::new(BufReader::new(stdout)), Some(child));
        let session = StdioSession::handshake(config.name.clone(), channel).await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, split};

    /// Minimal in-memory MCP server answering one request per line.
    fn spawn_fake_server(stream: tokio::io::DuplexStream) {
        tokio::spawn(async move {
            let (read, mut write) = split(stream);
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let msg: Value = serde_json::from_str(&line).unwrap();
                let Some(id) = msg.get("id").cloned() else {
                    continue;
                };
                let result = match msg["method"].as_str().unwrap() {
                    "initialize" => json!({"serverInfo": {"name": "fake"}, "capabilities": {}}),
                    "tools/list" if msg["params"].get("cursor").is_none() => json!({
                        "tools": [{"name": "list_tasks", "inputSchema": {"type": "object"}}],
                        "nextCursor": "p2"
                    }),
                    "tools/list" => json!({"tools": [{"name": "create_task", "description": "Create"}]}),
                    "tools/call" if msg["params"]["name"] == "boom" => {
                        let reply = json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32602, "message": "unknown tool"}});
                        write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
                        continue;
                    }
                    "tools/call" => json!({
                        "content": [{"type": "text", "text": format!("called {}", msg["params"]["name"])}]
                    }),
                    _ => json!({}),
                };
                // Interleave a notification to exercise id matching.
                write
                    .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/message\"}\n")
                    .await
                    .unwrap();
                let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
                write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
            }
        });
    }

    async fn fake_session() -> StdioSession {
        let (client, server) = duplex(4096);
        spawn_fake_server(server);
        let (read, write) = split(client);
        let channel = RpcChannel::new(Box::new(write), Box::new(BufReader::new(read)), None);
        StdioSession::handshake("GramTaskboard".into(), channel).await.unwrap()
    }

    #[tokio::test]
    async fn test_handshake_collects_paginated_tools() {
        let session = fake_session().await;
        let names: Vec<_> = session.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["list_tasks", "create_task"]);
        assert_eq!(session.server_name(), "GramTaskboard");
        assert_eq!(session.tools()[1].input_schema, json!({"type": "object", "properties": {}}));
    }

    #[tokio::test]
    async fn test_call_tool_returns_content() {
        let session = fake_session().await;
        let content = session.call_tool("list_tasks", json!({"userId": "u1"})).await.unwrap();
        assert_eq!(content, json!([{"type": "text", "text": "called \"list_tasks\""}]));
    }

    #[tokio::test]
    async fn test_remote_error_is_surfaced() {
        let session = fake_session().await;
        let err = session.call_tool("boom", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Remote { code: -32602, .. }));
    }

    #[tokio::test]
    async fn test_closed_stream() {
        let (client, server) = duplex(64);
        drop(server);
        let (read, write) = split(client);
        let channel = RpcChannel::new(Box::new(write), Box::new(BufReader::new(read)), None);
        let err = StdioSession::handshake("x".into(), channel).await.err().unwrap();
        assert!(matches!(err, ToolError::Io(_) | ToolError::Closed));
    }

    #[test]
    fn test_server_url_validation() {
        assert!(validate_server_url("http://taskboard:3000").is_ok());
        assert!(matches!(validate_server_url("taskboard:3000"), Err(ToolError::InvalidConfig(_))));
        assert!(matches!(validate_server_url("not a url"), Err(ToolError::InvalidConfig(_))));
        assert!(matches!(validate_server_url("ftp://taskboard"), Err(ToolError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url_before_spawning() {
        let config = ToolServerConfig {
            command: "definitely-not-a-real-binary-xyz".into(),
            server_url: "::bad::".into(),
            ..ToolServerConfig::default()
        };
        let err = StdioConnector::new().connect(&config).await.err().unwrap();
        assert!(matches!(err, ToolError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_connect_reports_spawn_failure() {
        let config = ToolServerConfig {
            command: "definitely-not-a-real-binary-xyz".into(),
            ..ToolServerConfig::default()
        };
        let err = StdioConnector::new().connect(&config).await.err().unwrap();
        assert!(matches!(err, ToolError::Spawn(_)));
    }
}
