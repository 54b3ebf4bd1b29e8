//! Error taxonomy for the chat pipeline.
//!
//! Resilience components produce these errors; the chat orchestrator is the
//! only place that turns them into user-facing text.

use thiserror::Error;

use crate::agent::AgentError;
use crate::resilience::circuit_breaker::CircuitState;
use crate::tools::ToolError;

/// Coarse classification of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ServiceUnavailable,
    ConnectionFailed,
    OperationTimeout,
    InvocationError,
    ConfigurationError,
    Unclassified,
}

/// Errors raised while serving a chat request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The circuit breaker refused the call.
    #[error("Tool service unavailable: circuit breaker is {state}")]
    ServiceUnavailable { state: CircuitState },

    /// Every connection attempt failed.
    #[error("Connection failed after {attempts} attempt(s): {source}")]
    ConnectionFailed {
        attempts: u32,
        #[source]
        source: ToolError,
    },

    /// The outer request deadline elapsed.
    #[error("Operation timeout after {secs} seconds")]
    OperationTimeout { secs: u64 },

    /// The agent or a tool call failed after the connection was established.
    #[error("Invocation error: {0}")]
    Invocation(String),

    /// Tool-service target is misconfigured.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("{0}")]
    Unclassified(String),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            ServiceError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            ServiceError::OperationTimeout { .. } => ErrorKind::OperationTimeout,
            ServiceError::Invocation(_) => ErrorKind::InvocationError,
            ServiceError::Configuration(_) => ErrorKind::ConfigurationError,
            ServiceError::Unclassified(_) => ErrorKind::Unclassified,
        }
    }
}

impl From<AgentError> for ServiceError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Tool(ToolError::InvalidConfig(msg)) => ServiceError::Configuration(msg),
            other => ServiceError::Invocation(other.to_string()),
        }
    }
}

/// Result alias for chat pipeline operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
