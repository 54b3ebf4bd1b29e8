//! Connection acquisition with retries.
//!
//! # Responsibilities
//! - Consult the circuit breaker before every attempt
//! - Bound each attempt with the connect timeout
//! - Back off exponentially between attempts
//! - Report every outcome to the breaker
//!
//! # Design Decisions
//! - A breaker that opens mid-loop aborts the remaining attempts
//! - Misconfiguration is not retried; it cannot heal between attempts
//! - Every suspension point observes the caller's cancellation token

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::{ResilienceConfig, ToolServerConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::tools::{ToolConnector, ToolError, ToolSession};

/// Retry parameters for connection acquisition.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ratio: f64,
    pub connect_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for RetryPolicy {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            jitter_ratio: config.jitter_ratio,
            connect_timeout: config.connect_timeout(),
        }
    }
}

/// Acquires tool service connections, guarded by the circuit breaker.
#[derive(Clone)]
pub struct ConnectionRetryOrchestrator {
    connector: Arc<dyn ToolConnector>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl ConnectionRetryOrchestrator {
    pub fn new(
        connector: Arc<dyn ToolConnector>,
        breaker: Arc<CircuitBreaker>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            breaker,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Establish a connection to `target`.
    pub async fn acquire(
        &self,
        target: &ToolServerConfig,
        cancel: &CancellationToken,
    ) -> ServiceResult<Box<dyn ToolSession>> {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if !self.breaker.can_execute() {
                let state = self.breaker.state();
                tracing::warn!(attempt, state = %state, "Circuit breaker rejected connection attempt");
                return Err(ServiceError::ServiceUnavailable { state });
            }

            tracing::debug!(attempt, server = %target.name, "Connecting to tool server");
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ToolError::Cancelled),
                res = tokio::time::timeout(self.policy.connect_timeout, self.connector.connect(target)) => {
                    res.unwrap_or_else(|_| Err(ToolError::Timeout(self.policy.connect_timeout.as_secs())))
                }
            };

            let err = match outcome {
                Ok(session) => {
                    self.breaker.record_success();
                    tracing::info!(attempt, server = %target.name, "Tool server connected");
                    return Ok(session);
                }
                Err(ToolError::Cancelled) => {
                    return Err(ServiceError::ConnectionFailed {
                        attempts: attempt + 1,
                        source: ToolError::Cancelled,
                    });
                }
                Err(e) => e,
            };

            self.breaker.record_failure();

            if let ToolError::InvalidConfig(msg) = &err {
                tracing::error!(error = %msg, "Tool server misconfigured, not retrying");
                return Err(ServiceError::Configuration(msg.clone()));
            }

            if attempt + 1 >= max_attempts {
                tracing::error!(attempts = max_attempts, error = %err, "Tool server connection attempts exhausted");
                return Err(ServiceError::ConnectionFailed {
                    attempts: max_attempts,
                    source: err,
                });
            }

            let state = self.breaker.state();
            if state == CircuitState::Open {
                tracing::warn!(attempt, "Circuit breaker opened during retries, aborting");
                return Err(ServiceError::ServiceUnavailable { state });
            }

            let delay = calculate_backoff(
                attempt,
                self.policy.base_delay_ms,
                self.policy.max_delay_ms,
                self.policy.jitter_ratio,
            );
            tracing::info!(attempt, delay = ?delay, error = %err, "Retrying tool server connection");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ServiceError::ConnectionFailed {
                        attempts: attempt + 1,
                        source: ToolError::Cancelled,
                    });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // max_attempts >= 1, so the loop always returns.
        Err(ServiceError::Unclassified("no connection attempt was made".into()))
    }
}
