//! # Retry Backoff
//!
//! How long the sync driver waits before draining again after a drain was
//! blocked by an operation that failed to replay. The queue itself counts
//! retries; this module only decides the spacing.
//!
//! ```rust
//! use fitsync::client::offline::retry::{BackoffStrategy, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(BackoffStrategy::exponential(
//!     Duration::from_secs(1),
//!     Duration::from_secs(60),
//! ));
//! assert_eq!(policy.delay_for(1), Duration::from_secs(1));
//! assert_eq!(policy.delay_for(3), Duration::from_secs(4));
//! assert_eq!(policy.delay_for(20), Duration::from_secs(60));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Backoff strategy configuration
#[derive(Clone)]
pub enum BackoffStrategy {
    /// Same delay after every blocked drain
    Fixed { interval: Duration },
    /// Doubling delay, capped at `max`
    Exponential { base: Duration, max: Duration },
    /// Caller-supplied delay per attempt
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl BackoffStrategy {
    pub fn fixed(interval: Duration) -> Self {
        BackoffStrategy::Fixed { interval }
    }

    pub fn exponential(base: Duration, max: Duration) -> Self {
        BackoffStrategy::Exponential { base, max }
    }
}

impl fmt::Debug for BackoffStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackoffStrategy::Fixed { interval } => {
                f.debug_struct("Fixed").field("interval", interval).finish()
            }
            BackoffStrategy::Exponential { base, max } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("max", max)
                .finish(),
            BackoffStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(300), // 5 minutes
        }
    }
}

/// Backoff applied between blocked drains
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    strategy: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(strategy: BackoffStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &BackoffStrategy {
        &self.strategy
    }

    /// Delay before the `attempt`-th consecutive retry (1-based; 0 means no wait)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match &self.strategy {
            BackoffStrategy::Fixed { interval } => *interval,
            BackoffStrategy::Exponential { base, max } => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(*max).min(*max)
            }
            BackoffStrategy::Custom(calc) => calc(attempt),
        }
    }

    /// Replace the backoff strategy
    pub fn set_strategy(&mut self, strategy: BackoffStrategy) {
        self.strategy = strategy;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_exponential_capped_at_five_minutes() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(9), Duration::from_secs(256));
        assert_eq!(policy.delay_for(10), Duration::from_secs(300));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(300));
    }

    #[test]
    fn test_zero_attempt_has_no_delay() {
        assert_eq!(RetryPolicy::default().delay_for(0), Duration::ZERO);
    }

    #[test]
    fn test_fixed_backoff() {
        let policy = RetryPolicy::new(BackoffStrategy::fixed(Duration::from_millis(750)));
        assert_eq!(policy.delay_for(1), Duration::from_millis(750));
        assert_eq!(policy.delay_for(7), Duration::from_millis(750));
    }

    #[test]
    fn test_custom_backoff() {
        let mut policy = RetryPolicy::default();
        policy.set_strategy(BackoffStrategy::Custom(Arc::new(|attempt| {
            Duration::from_millis(u64::from(attempt) * 10)
        })));
        assert_eq!(policy.delay_for(3), Duration::from_millis(30));
        assert_eq!(format!("{:?}", policy.strategy()), "Custom(..)");
    }
}
