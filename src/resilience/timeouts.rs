//! Outer deadline for a chat request.
//!
//! # Responsibilities
//! - Wrap connect → invoke → respond in a single deadline
//! - Cancel in-flight work cleanly on timeout
//! - Record the timeout on the circuit breaker
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities plus an explicit cancellation token
//! - The deadline is larger than the per-attempt connect timeout
//! - Timeout errors are distinct from other errors

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ServiceError, ServiceResult};
use crate::resilience::circuit_breaker::CircuitBreaker;

/// Runs an operation under a hard deadline.
#[derive(Debug, Clone)]
pub struct TimeoutEnvelope {
    deadline: Duration,
    breaker: Arc<CircuitBreaker>,
}

impl TimeoutEnvelope {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(180);

    pub fn new(deadline: Duration, breaker: Arc<CircuitBreaker>) -> Self {
        Self { deadline, breaker }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `op` to completion or until the deadline elapses.
    ///
    /// `op` receives a token that is cancelled when the envelope exits, so
    /// suspended sub-operations and any work spawned from them stop too.
    /// The future itself is dropped on timeout, releasing whatever it owns.
    pub async fn run<T, F, Fut>(&self, op: F) -> ServiceResult<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ServiceResult<T>>,
    {
        let token = CancellationToken::new();
        let _guard = token.clone().drop_guard();

        match tokio::time::timeout(self.deadline, op(token.clone())).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                self.breaker.record_failure();
                tracing::warn!(
                    deadline_secs = self.deadline.as_secs(),
                    failure_count = self.breaker.failure_count(),
                    "Request deadline exceeded, operation cancelled"
                );
                Err(ServiceError::OperationTimeout {
                    secs: self.deadline.as_secs(),
                })
            }
        }
    }
}
