//! Tool service subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionRetryOrchestrator
//!     → ToolConnector::connect (stdio.rs spawns the MCP subprocess)
//!     → ToolSession (tools/list result + tools/call)
//!     → agent invokes tools through the session
//!     → usage.rs normalizes the agent's raw result into ToolUsage
//! ```
//!
//! # Design Decisions
//! - Connector and session are traits so the chat pipeline can be driven by fakes
//! - A session owns its subprocess; dropping it releases everything
//! - Tool usage reporting is best-effort and never fails a request

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ToolServerConfig;

pub mod stdio;
pub mod usage;

pub use stdio::StdioConnector;
pub use usage::{normalize, ToolInvocationRecord, ToolUsage};

/// Errors raised by the tool service.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool server target is misconfigured (e.g. malformed URL).
    #[error("Invalid tool server configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn tool server: {0}")]
    Spawn(String),

    #[error("Tool server I/O error: {0}")]
    Io(String),

    #[error("Tool server protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error returned by the server.
    #[error("Tool server returned error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("Tool server connection closed")]
    Closed,

    #[error("Tool server connect timeout after {0} seconds")]
    Timeout(u64),

    #[error("Tool server operation cancelled")]
    Cancelled,
}

/// A tool advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// An established connection to the tool server.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Name of the server this session is bound to.
    fn server_name(&self) -> &str;

    /// Tools discovered during the handshake.
    fn tools(&self) -> &[ToolDefinition];

    /// Invoke a tool and return its raw result content.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, ToolError>;
}

/// Establishes tool server connections.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self, config: &ToolServerConfig) -> Result<Box<dyn ToolSession>, ToolError>;
}
