//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit tracing events and spans
//!     → logging.rs (EnvFilter + pretty/JSON fmt layer)
//!     → stdout
//!
//! HTTP requests additionally carry:
//!     → x-request-id (set or propagated by tower-http)
//!     → TraceLayer spans around every request
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all request logs
//! - Chat requests run inside a span tagged with the session ID

pub mod logging;

pub use logging::init_logging;
