//! LLM agent subsystem.
//!
//! # Data Flow
//! ```text
//! ChatOrchestrator
//!     → ChatAgent (name + instruction, bound to one ToolSession)
//!     → AgentRuntime::invoke (openai.rs: completions ↔ tools/call rounds)
//!     → AgentOutput { text, raw }
//!     → tools::usage::normalize(raw)
//! ```
//!
//! # Design Decisions
//! - The runtime is a trait; generation internals stay behind it
//! - The raw result is plain JSON so tool usage extraction never depends on
//!   a particular runtime's types

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::tools::{ToolError, ToolSession};

pub mod openai;

pub use openai::OpenAiAgent;

/// Errors raised by an agent runtime.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model API request failed or returned a non-success status.
    #[error("Model API error: {0}")]
    Api(String),

    /// Model API returned something we cannot interpret.
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// A tool call failed at the transport level.
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Exceeded {0} tool rounds without a final answer")]
    ToolRoundsExceeded(usize),
}

/// An agent bound to a tool session for the duration of one request.
pub struct ChatAgent<'a> {
    pub name: &'a str,
    pub instruction: String,
    pub tools: &'a dyn ToolSession,
}

/// Result of one agent invocation.
#[derive(Debug, Clone)]
pub struct AgentOutput {
    /// Final assistant text.
    pub text: String,
    /// Runtime-specific record of the exchange, inspected for tool usage.
    pub raw: Value,
}

/// Drives an agent to a final answer.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn invoke(
        &self,
        agent: &ChatAgent<'_>,
        message: &str,
        session_id: &str,
    ) -> Result<AgentOutput, AgentError>;
}
