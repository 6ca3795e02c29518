//! Retry policy for correction requests.

use std::time::Duration;

/// Bounded retry with linear backoff.
///
/// After failed attempt `n` the client waits `backoff_unit * n` before
/// attempt `n + 1`. No delay precedes the first attempt and none follows
/// the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit multiplied by the attempt number.
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts,
            backoff_unit,
        }
    }

    /// A policy making a single attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Attempts actually made, never fewer than one.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay after failed attempt `attempt` (1-based), or `None` if it was the last.
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        (attempt >= 1 && attempt < self.effective_attempts()).then(|| self.backoff_unit * attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.backoff(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.backoff(3), None);
    }

    #[test]
    fn test_backoff_strictly_increasing() {
        let policy = RetryPolicy::new(6, Duration::from_millis(250));
        let delays: Vec<_> = (1..6).filter_map(|a| policy.backoff(a)).collect();

        assert_eq!(delays.len(), 5);
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_no_delay_before_first_attempt() {
        assert_eq!(RetryPolicy::default().backoff(0), None);
    }

    #[test]
    fn test_zero_attempts_treated_as_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.effective_attempts(), 1);
        assert_eq!(policy.backoff(1), None);
        assert_eq!(RetryPolicy::no_retry().effective_attempts(), 1);
    }
}
