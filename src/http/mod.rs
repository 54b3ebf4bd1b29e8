//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router; request ID, trace and CORS layers)
//!     → handlers.rs
//!         GET  /health → breaker snapshot (read-only)
//!         POST /chat   → ChatOrchestrator::handle_chat
//!     → JSON response (200 for every chat outcome)
//! ```

pub mod handlers;
pub mod server;

pub use server::{shutdown_signal, AppState, HttpServer};
