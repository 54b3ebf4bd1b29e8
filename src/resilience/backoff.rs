//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Backoff delay after the failed attempt with 0-based index `attempt`.
///
/// `base * 2^attempt`, capped at `max_ms`. With `jitter_ratio > 0` up to that
/// fraction of the delay is added on top.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter_ratio: f64) -> Duration {
    let exponential_base = 2u64.saturating_pow(attempt);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter_ratio.clamp(0.0, 1.0)) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
