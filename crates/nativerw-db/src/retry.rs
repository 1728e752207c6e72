use std::time::Duration;

/// How the [`ConnectionManager`](crate::ConnectionManager) retries a failed
/// dial: a fixed pause between attempts, optionally capped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub backoff: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

    /// Retry forever, sleeping `backoff` between attempts.
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` (at least one).
    pub fn bounded(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    /// Whether another attempt may follow `attempts_made` failed ones.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts_made < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Self::DEFAULT_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retries_forever() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff, Duration::from_secs(5));
        assert!(p.should_retry(0));
        assert!(p.should_retry(u32::MAX));
    }

    #[test]
    fn bounded_stops_after_max() {
        let p = RetryPolicy::bounded(Duration::from_millis(10), 3);
        assert!(p.should_retry(1));
        assert!(p.should_retry(2));
        assert!(!p.should_retry(3));
    }

    #[test]
    fn bounded_allows_at_least_one_attempt() {
        assert_eq!(RetryPolicy::bounded(Duration::ZERO, 0).max_attempts, Some(1));
    }
}
