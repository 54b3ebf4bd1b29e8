//! Chat subsystem.
//!
//! # Data Flow
//! ```text
//! POST /chat (ChatRequest)
//!     → ChatOrchestrator::handle_chat
//!         → context.rs (turn count, limit check, user identity, prompts)
//!         → TimeoutEnvelope { ConnectionRetryOrchestrator::acquire → AgentRuntime::invoke }
//!         → tools::normalize (tool usage)
//!         → advisory.rs on any failure
//!     → ChatResponse
//! ```
//!
//! # Design Decisions
//! - `handle_chat` returns a response on every path; errors never reach HTTP
//! - Advisories map typed error kinds first, message keywords second
//! - Tool sessions and agents live only for the request that created them

pub mod advisory;
pub mod context;
pub mod orchestrator;
pub mod types;

pub use advisory::Advisory;
pub use orchestrator::ChatOrchestrator;
pub use types::{ChatRequest, ChatResponse, HistoryMessage};
