//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for requeueing failed reconciliations.
//! It grows more slowly than exponential backoff, which suits registries whose
//! pods are still starting: the first retries come quickly, later ones settle
//! at the cap instead of drifting towards hours.
//!
//! Sequence with the controller defaults: 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s,
//! 170s, 275s, 300s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Stateless: the caller tracks how many consecutive failures an object has
/// seen and asks for the matching delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciBackoff {
    /// First (and second) delay in seconds
    min_secs: u64,
    /// Upper bound in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new backoff with the given bounds in seconds
    #[must_use]
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Delay before the next attempt after `error_count` consecutive failures.
    ///
    /// `error_count` is 1-based: the first failure gets `min_secs`, so does the
    /// second, and from there each delay is the sum of the previous two,
    /// capped at `max_secs`.
    #[must_use]
    pub fn delay_for(&self, error_count: u32) -> Duration {
        if error_count <= 2 {
            return Duration::from_secs(self.min_secs.min(self.max_secs));
        }

        let mut prev_secs = self.min_secs;
        let mut current_secs = self.min_secs;

        for _ in 3..=error_count {
            let next_secs = prev_secs.saturating_add(current_secs);
            prev_secs = current_secs;
            current_secs = next_secs.min(self.max_secs);

            if current_secs >= self.max_secs {
                break;
            }
        }

        Duration::from_secs(current_secs)
    }
}
