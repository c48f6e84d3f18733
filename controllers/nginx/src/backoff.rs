//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciles. Grows more slowly than exponential
//! backoff, so a child that takes a few runs to settle is retried promptly
//! while a persistently failing resource still backs off to the cap.
//!
//! With the default bounds (5s, 300s) the sequence is
//! 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s, 170s, 275s, 300s.

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_secs`
/// twice and capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay in seconds (for reset)
    min_secs: u64,
    /// Previous delay in seconds
    prev_secs: u64,
    /// Delay handed out next, in seconds
    current_secs: u64,
    /// Maximum delay in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff bounded by `min_secs` and `max_secs`
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs.min(max_secs),
            max_secs,
        }
    }

    /// Get the next delay in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result = self.current_secs;

        let next = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = next.min(self.max_secs);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs.min(self.max_secs);
    }
}
