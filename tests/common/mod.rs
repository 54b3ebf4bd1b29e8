//! Shared fakes for chat pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use mcp_chat_service::agent::{AgentError, AgentOutput, AgentRuntime, ChatAgent};
use mcp_chat_service::chat::HistoryMessage;
use mcp_chat_service::config::{ServiceConfig, ToolServerConfig};
use mcp_chat_service::tools::{ToolConnector, ToolDefinition, ToolError, ToolSession};
use mcp_chat_service::{ChatOrchestrator, CircuitBreaker};

/// Session advertising a single `list_tasks` tool.
pub struct FakeSession {
    defs: Vec<ToolDefinition>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            defs: vec![ToolDefinition {
                name: "list_tasks".into(),
                description: Some("List the user's tasks".into()),
                input_schema: json!({"type": "object", "properties": {"userId": {"type": "string"}}}),
            }],
        }
    }
}

#[async_trait]
impl ToolSession for FakeSession {
    fn server_name(&self) -> &str {
        "GramTaskboard"
    }

    fn tools(&self) -> &[ToolDefinition] {
        &self.defs
    }

    async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<Value, ToolError> {
        Ok(json!("[]"))
    }
}

/// Connector that fails its first `failures` calls with `error`, then succeeds.
pub struct ScriptedConnector {
    failures: u32,
    error: ToolError,
    hang: bool,
    connects: AtomicU32,
}

impl ScriptedConnector {
    pub fn healthy() -> Arc<Self> {
        Self::failing_first(0, ToolError::Closed)
    }

    pub fn failing_first(failures: u32, error: ToolError) -> Arc<Self> {
        Arc::new(Self {
            failures,
            error,
            hang: false,
            connects: AtomicU32::new(0),
        })
    }

    /// Every connect stays pending until dropped.
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            failures: 0,
            error: ToolError::Closed,
            hang: true,
            connects: AtomicU32::new(0),
        })
    }

    pub fn always_failing(error: ToolError) -> Arc<Self> {
        Self::failing_first(u32::MAX, error)
    }

    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolConnector for ScriptedConnector {
    async fn connect(&self, _config: &ToolServerConfig) -> Result<Box<dyn ToolSession>, ToolError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if n < self.failures {
            Err(self.error.clone())
        } else {
            Ok(Box::new(FakeSession::new()))
        }
    }
}

/// What a [`ScriptedAgent`] does when invoked.
pub enum AgentBehavior {
    Reply { text: String, raw: Value },
    Hang,
    ApiError(String),
    ToolError(ToolError),
    Panic,
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub instruction: String,
    pub message: String,
    pub session_id: String,
}

pub struct ScriptedAgent {
    behavior: AgentBehavior,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedAgent {
    pub fn new(behavior: AgentBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str, raw: Value) -> Arc<Self> {
        Self::new(AgentBehavior::Reply {
            text: text.to_string(),
            raw,
        })
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRuntime for ScriptedAgent {
    async fn invoke(
        &self,
        agent: &ChatAgent<'_>,
        message: &str,
        session_id: &str,
    ) -> Result<AgentOutput, AgentError> {
        self.invocations.lock().unwrap().push(Invocation {
            instruction: agent.instruction.clone(),
            message: message.to_string(),
            session_id: session_id.to_string(),
        });

        match &self.behavior {
            AgentBehavior::Reply { text, raw } => Ok(AgentOutput {
                text: text.clone(),
                raw: raw.clone(),
            }),
            AgentBehavior::Hang => std::future::pending().await,
            AgentBehavior::ApiError(msg) => Err(AgentError::Api(msg.clone())),
            AgentBehavior::ToolError(err) => Err(AgentError::Tool(err.clone())),
            AgentBehavior::Panic => panic!("agent runtime bug"),
        }
    }
}

/// Default config with short backoffs.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.resilience.base_delay_ms = 10;
    config.resilience.max_delay_ms = 100;
    config.agent.api_key = "sk-test".into();
    config
}

pub fn orchestrator(
    config: &ServiceConfig,
    connector: Arc<ScriptedConnector>,
    agent: Arc<ScriptedAgent>,
) -> (Arc<ChatOrchestrator>, Arc<CircuitBreaker>) {
    let breaker = Arc::new(CircuitBreaker::new(
        config.resilience.failure_threshold,
        config.resilience.recovery_timeout(),
    ));
    let orchestrator = ChatOrchestrator::new(config, connector, agent, breaker.clone());
    (Arc::new(orchestrator), breaker)
}

pub fn history(entries: &[(&str, &str)]) -> Vec<HistoryMessage> {
    entries
        .iter()
        .map(|(role, content)| HistoryMessage::new(*role, *content))
        .collect()
}
