//! Circuit breaker for the tool service.
//!
//! # States
//! - Closed: normal operation, connection attempts pass through
//! - Open: tool service assumed down, attempts fail fast
//! - Half-Open: a single probe is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= threshold
//! Open → Half-Open: recovery timeout elapsed since last failure
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails (re-arms the timeout)
//! ```
//!
//! # Design Decisions
//! - One breaker per process, injected by the composition root
//! - Every read-modify-write happens under a single mutex
//! - The lock is never held across an await

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of the breaker, used by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub can_execute: bool,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
}

/// Thread-safe circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
    pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
            }),
            failure_threshold,
            recovery_timeout,
        }
    }

    // A panic while holding the lock cannot leave `Inner` half-updated,
    // so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recovery_elapsed(&self, inner: &Inner) -> bool {
        match inner.last_failure {
            Some(at) => at.elapsed() > self.recovery_timeout,
            None => true,
        }
    }

    /// Decide whether a connection attempt may proceed.
    ///
    /// In the Open state this moves the breaker to Half-Open once the
    /// recovery timeout has passed; the check and the transition happen
    /// under the same lock.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if self.recovery_elapsed(&inner) {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!(
                        failure_count = inner.failure_count,
                        "Circuit breaker half-open, allowing probe"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Non-mutating variant of [`can_execute`](Self::can_execute) for reporting.
    pub fn peek_can_execute(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => self.recovery_elapsed(&inner),
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(previous = %inner.state, "Circuit breaker closed");
        }
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());

        if inner.failure_count >= self.failure_threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    failure_count = inner.failure_count,
                    threshold = self.failure_threshold,
                    recovery_secs = self.recovery_timeout.as_secs(),
                    "Circuit breaker opened"
                );
            }
            inner.state = CircuitState::Open;
        } else {
            tracing::debug!(failure_count = inner.failure_count, "Tool service failure recorded");
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let can_execute = match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => self.recovery_elapsed(&inner),
        };
        BreakerSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            can_execute,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FAILURE_THRESHOLD, Self::DEFAULT_RECOVERY_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_stays_closed_below_threshold() {
        let cb = CircuitBreaker::default();
        for n in 1..5 {
            cb.record_failure();
            assert_eq!(cb.state(), CircuitState::Closed, "after {} failures", n);
            assert!(cb.can_execute());
        }
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.failure_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_until_recovery_timeout() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();

        assert!(!cb.can_execute());
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!cb.can_execute());
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // Half-open keeps admitting until an outcome is recorded.
        assert!(cb.can_execute());
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_and_rearms() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(10));
        cb.record_failure();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cb.can_execute());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cb.can_execute());
    }

    #[test]
    fn test_success_resets_from_any_state() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..7 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Open);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_from_half_open_closes() {
        let cb = CircuitBreaker::new(2, Duration::from_secs(5));
        for _ in 0..4 {
            cb.record_failure();
        }
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_does_not_transition() {
        let cb = CircuitBreaker::new(1, Duration::from_secs(5));
        cb.record_failure();
        tokio::time::advance(Duration::from_secs(6)).await;

        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert!(snap.can_execute);
        assert!(cb.peek_can_execute());
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[test]
    fn test_concurrent_failures_are_counted() {
        let cb = Arc::new(CircuitBreaker::new(1000, Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        cb.record_failure();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.failure_count(), 400);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let cb = CircuitBreaker::default();
        let json = serde_json::to_value(cb.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": "CLOSED", "failureCount": 0, "canExecute": true})
        );
    }
}
