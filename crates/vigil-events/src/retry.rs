//! Bounded retry with capped exponential backoff.

use std::time::Duration;

use crate::error::{EventError, Result};

/// How often and how patiently a failing event is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per event, including the first.
    pub max_attempts: u32,

    /// Delay after the first failure.
    pub initial_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,

    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Check the policy is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(EventError::InvalidConfig("max_attempts must be at least 1".into()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(EventError::InvalidConfig(format!(
                "backoff multiplier must be >= 1, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(EventError::InvalidConfig(
                "initial retry delay exceeds max delay".into(),
            ));
        }
        Ok(())
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_exponential_growth() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(1).as_millis(), 100);
        assert_eq!(policy.delay_for_attempt(2).as_millis(), 200);
        assert_eq!(policy.delay_for_attempt(3).as_millis(), 400);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(20), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());

        let zero = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(zero.validate().is_err());

        let shrinking = RetryPolicy {
            multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert!(shrinking.validate().is_err());

        let inverted = RetryPolicy {
            initial_delay: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        assert!(inverted.validate().is_err());
    }

    proptest! {
        #[test]
        fn test_delays_non_decreasing_and_bounded(
            initial_ms in 1u64..1_000,
            extra_ms in 0u64..60_000,
            multiplier in 1.0f64..4.0,
            attempt in 1u32..64,
        ) {
            let policy = RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::from_millis(initial_ms),
                max_delay: Duration::from_millis(initial_ms + extra_ms),
                multiplier,
            };
            prop_assert!(policy.validate().is_ok());

            let this = policy.delay_for_attempt(attempt);
            let next = policy.delay_for_attempt(attempt + 1);
            prop_assert!(this <= next);
            prop_assert!(next <= policy.max_delay);
        }
    }
}
