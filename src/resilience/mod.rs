//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Chat request:
//!     → timeouts.rs (outer deadline around connect + invoke)
//!         → retries.rs (acquire connection, backoff between attempts)
//!             → circuit_breaker.rs (gate every attempt, record outcomes)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Circuit breaker prevents hammering a degraded tool server
//! - One breaker per process, passed by reference to every request

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retries::{ConnectionRetryOrchestrator, RetryPolicy};
pub use timeouts::TimeoutEnvelope;
