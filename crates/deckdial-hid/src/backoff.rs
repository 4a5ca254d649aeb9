//! Reconnect delay policy.

use std::time::Duration;

/// Bounded exponential backoff between re-open attempts.
///
/// The first attempt after a disconnect runs immediately. Later attempts wait
/// `initial * 2^(attempt - 1)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    /// Failed attempts after which the device counts as persistently gone.
    /// Zero disables the ceiling.
    pub ceiling: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self { initial: Duration::from_millis(100), max: Duration::from_secs(5), ceiling: 10 }
    }
}

impl Backoff {
    /// Delay before re-open attempt number `attempt` (zero-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        self.initial.checked_mul(factor).map_or(self.max, |d| d.min(self.max))
    }

    /// Whether `failed_attempts` has reached the retry ceiling.
    #[must_use]
    pub fn is_exhausted(&self, failed_attempts: u32) -> bool {
        self.ceiling > 0 && failed_attempts >= self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_retry_is_immediate() {
        assert_eq!(Backoff::default().delay(0), Duration::ZERO);
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let backoff = Backoff {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(1000),
            ceiling: 5,
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(400));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_millis(1000));
        assert_eq!(backoff.delay(40), Duration::from_millis(1000));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_ceiling() {
        let backoff = Backoff { ceiling: 3, ..Backoff::default() };
        assert!(!backoff.is_exhausted(2));
        assert!(backoff.is_exhausted(3));

        let unbounded = Backoff { ceiling: 0, ..Backoff::default() };
        assert!(!unbounded.is_exhausted(u32::MAX));
    }
}
