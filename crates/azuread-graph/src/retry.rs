//! Backoff policy for throttled and transiently failing Graph requests.

use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// How requests answered with 429 or 502/503/504 are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// First backoff delay; doubles on every further attempt.
    pub base_delay: Duration,
    /// Upper bound for any single wait, including `Retry-After` values.
    pub max_delay: Duration,
    /// Random extra delay as a fraction of the computed delay.
    pub jitter_factor: f64,
    /// Retries allowed per request before giving up.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(300),
            jitter_factor: 0.25,
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    /// Short delays for tests against mock servers.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            jitter_factor: 0.0,
            max_retries: 3,
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_delay.is_zero() {
            return Err("base_delay must be > 0".to_string());
        }
        if self.max_delay < self.base_delay {
            return Err("max_delay must be >= base_delay".to_string());
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err("jitter_factor must be in range [0.0, 1.0]".to_string());
        }
        Ok(())
    }

    /// Parses a `Retry-After` header. Only the delay-seconds form is used by
    /// Graph.
    #[must_use]
    pub fn parse_retry_after(header_value: &str) -> Option<u64> {
        header_value.trim().parse::<u64>().ok()
    }

    /// Exponential delay for `attempt` (zero based), capped at `max_delay`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Adds up to `jitter_factor` of random delay.
    #[must_use]
    pub fn with_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter_factor);
        delay + delay.mul_f64(extra)
    }

    /// Delay before the next attempt, preferring the server's `Retry-After`.
    #[must_use]
    pub fn delay_for(&self, retry_after_secs: Option<u64>, attempt: u32) -> Duration {
        let delay = match retry_after_secs {
            Some(secs) => {
                let requested = Duration::from_secs(secs);
                if requested > self.max_delay {
                    warn!(
                        "Retry-After {secs}s exceeds max, capping at {:?}",
                        self.max_delay
                    );
                }
                requested.min(self.max_delay)
            }
            None => self.backoff_delay(attempt),
        };
        self.with_jitter(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let policy = RetryPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_retries, 5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let policy = RetryPolicy {
            jitter_factor: 1.5,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RetryPolicy {
            max_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(RetryPolicy::parse_retry_after("30"), Some(30));
        assert_eq!(RetryPolicy::parse_retry_after(" 5 "), Some(5));
        assert_eq!(
            RetryPolicy::parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            None
        );
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::for_testing();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(10));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(20));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(40));
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let policy = RetryPolicy::for_testing();
        assert_eq!(policy.delay_for(Some(60), 0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(None, 1), Duration::from_millis(20));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::default();
        let delay = Duration::from_millis(1000);
        for _ in 0..50 {
            let jittered = policy.with_jitter(delay);
            assert!(jittered >= delay);
            assert!(jittered <= Duration::from_millis(1250));
        }
    }
}
