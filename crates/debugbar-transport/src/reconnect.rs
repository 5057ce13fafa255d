//! Reconnection policy with a fixed retry delay

use std::time::Duration;

/// Default delay between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Tracks consecutive failed sessions against a configured maximum
///
/// The delay between attempts is fixed. `max_attempts == 0` means
/// unlimited retries.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    delay: Duration,
    max_attempts: u32,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            attempt: 0,
        }
    }

    /// Register a failed session and decide whether to retry
    ///
    /// Returns the delay to wait before the next attempt, or `None` once
    /// the attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.max_attempts > 0 && self.attempt >= self.max_attempts {
            return None;
        }
        Some(self.delay)
    }

    /// Reset the attempt counter (call after a successful open)
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Number of consecutive failures registered so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_retries_with_fixed_delay() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 0);

        for expected_attempt in 1..=20 {
            assert_eq!(policy.next_delay(), Some(Duration::from_millis(10)));
            assert_eq!(policy.attempt(), expected_attempt);
        }
    }

    #[test]
    fn budget_exhausts_on_the_final_attempt() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 3);

        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn reset_restores_the_budget() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(10), 2);

        assert!(policy.next_delay().is_some());
        policy.reset();
        assert_eq!(policy.attempt(), 0);
        assert!(policy.next_delay().is_some());
        assert_eq!(policy.next_delay(), None);
    }
}
