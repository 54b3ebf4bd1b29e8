//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the chat service.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the chat service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, CORS).
    pub listener: ListenerConfig,

    /// Circuit breaker, retry and timeout settings.
    pub resilience: ResilienceConfig,

    /// Conversation policy.
    pub chat: ChatConfig,

    /// Tool server subprocess definition.
    pub tool_server: ToolServerConfig,

    /// LLM agent settings.
    pub agent: AgentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8085").
    pub bind_address: String,

    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8085".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Resilience configuration for the tool service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds the circuit stays open before a probe is allowed.
    pub recovery_timeout_secs: u64,

    /// Maximum connection attempts per request.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Fraction of each delay added as random jitter (0.0 disables jitter).
    pub jitter_ratio: f64,

    /// Per-attempt connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Outer deadline for connect + invoke in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 60,
            max_attempts: 3,
            base_delay_ms: 2000,
            max_delay_ms: 60_000,
            jitter_ratio: 0.0,
            connect_timeout_secs: 120,
            request_timeout_secs: 180,
        }
    }
}

impl ResilienceConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Conversation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum user-authored messages per conversation (current one included).
    pub max_user_messages: usize,

    /// Prefix the agent message with the supplied conversation history.
    pub include_history_context: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_user_messages: 5,
            include_history_context: true,
        }
    }
}

/// Tool server subprocess definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ToolServerConfig {
    /// Server name, used in agent instructions and logs.
    pub name: String,

    /// Executable to spawn.
    pub command: String,

    /// Arguments passed to the executable.
    pub args: Vec<String>,

    /// URL of the service the tool server fronts.
    pub server_url: String,

    /// Environment variable through which `server_url` is handed to the child.
    pub url_env_var: String,

    /// Extra environment for the child process.
    pub env: HashMap<String, String>,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            name: "GramTaskboard".to_string(),
            command: "npx".to_string(),
            args: vec!["-y".to_string(), "gram-taskboard-mcp".to_string()],
            server_url: "http://taskboard:3000".to_string(),
            url_env_var: "TASKBOARD_SERVER_URL".to_string(),
            env: HashMap::new(),
        }
    }
}

/// LLM agent settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent name reported in logs.
    pub name: String,

    /// Base URL of an OpenAI-compatible API.
    pub api_base: String,

    /// API key (usually `${OPENAI_API_KEY}`).
    pub api_key: String,

    /// Chat model.
    pub model: String,

    /// Upper bound on model ↔ tool round trips per request.
    pub max_tool_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "chat_agent".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tool_rounds: 8,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
