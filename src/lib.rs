//! MCP chat service library.
//!
//! A chat endpoint that hands user messages to an LLM agent whose tools live
//! in an MCP tool-server subprocess. The interesting part is the resilience
//! layer around that subprocess.
//!
//! ```text
//!   POST /chat
//!       │
//!       ▼
//!   ChatOrchestrator ── turn limit, identity, advisories
//!       │
//!       ▼
//!   TimeoutEnvelope (request deadline, cancellation)
//!       │
//!       ├─▶ ConnectionRetryOrchestrator ─▶ CircuitBreaker
//!       │         │
//!       │         ▼
//!       │   ToolConnector (stdio MCP subprocess)
//!       │
//!       └─▶ AgentRuntime (OpenAI-compatible) ─▶ ToolSession::call_tool
//!                 │
//!                 ▼
//!           tools::normalize ─▶ ChatResponse.toolUsage
//! ```

// Core pipeline
pub mod agent;
pub mod chat;
pub mod resilience;
pub mod tools;

// Edges
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod error;
pub mod observability;

pub use chat::{ChatOrchestrator, ChatRequest, ChatResponse};
pub use config::ServiceConfig;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use http::HttpServer;
pub use resilience::CircuitBreaker;
