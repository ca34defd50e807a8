//! Exponential backoff for reconnects after a failure.

use std::time::Duration;

/// First reconnect delay.
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound of the reconnect delay.
pub const MAX_DELAY: Duration = Duration::from_secs(5 * 60);

/// An exponential backoff state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    /// Factor to multiply the current delay to calculate the next one.
    pub factor: u32,
    /// Delay clamp.
    pub max: Duration,
    /// Delay returned after a reset.
    pub initial: Duration,
    value: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, 2, MAX_DELAY)
    }
}

impl Backoff {
    /// Creates a backoff starting at `initial`.
    #[must_use]
    pub const fn new(initial: Duration, factor: u32, max: Duration) -> Self {
        Self {
            factor,
            max,
            initial,
            value: initial,
        }
    }

    /// Obtain the stored delay value and precompute next one.
    pub fn advance(&mut self) -> Duration {
        let current = self.value;
        self.value = current.saturating_mul(self.factor).min(self.max);
        current
    }

    /// Peek the stored delay value.
    #[must_use]
    pub const fn peek(&self) -> Duration {
        self.value
    }

    /// Starts over from the initial delay.
    pub const fn reset(&mut self) {
        self.value = self.initial;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_clamped() {
        let mut backoff = Backoff::new(Duration::from_secs(1), 2, Duration::from_secs(5));
        let delays: Vec<u64> = (0..5).map(|_| backoff.advance().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::default();
        backoff.advance();
        backoff.advance();
        assert_eq!(backoff.peek(), Duration::from_secs(4));

        backoff.reset();
        assert_eq!(backoff.advance(), INITIAL_DELAY);
    }
}
