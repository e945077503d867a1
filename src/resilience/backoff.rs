//! Delay between retry attempts.

use std::time::Duration;
use rand::Rng;
use crate::config::{BackoffKind, RetryConfig};

/// Backoff schedule for the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * 2^(attempt-1)` capped at `max`, plus up to 10% jitter.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    pub fn from_config(config: &RetryConfig) -> Self {
        match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed(Duration::from_millis(config.base_delay_ms)),
            BackoffKind::Exponential => Backoff::Exponential {
                base: Duration::from_millis(config.base_delay_ms),
                max: Duration::from_millis(config.max_delay_ms),
            },
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => {
                if attempt == 0 {
                    Duration::ZERO
                } else {
                    delay
                }
            }
            Backoff::Exponential { base, max } => {
                calculate_backoff(attempt, base.as_millis() as u64, max.as_millis() as u64)
            }
        }
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let max = calculate_backoff(10, 100, 1000);
        assert!(max.as_millis() >= 1000 && max.as_millis() < 1100);
    }

    #[test]
    fn test_fixed_backoff() {
        let backoff = Backoff::Fixed(Duration::from_millis(500));
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(7), Duration::from_millis(500));
    }

    #[test]
    fn test_from_config() {
        let config = RetryConfig {
            backoff: BackoffKind::Exponential,
            base_delay_ms: 10,
            max_delay_ms: 40,
            ..RetryConfig::default()
        };
        assert_eq!(
            Backoff::from_config(&config),
            Backoff::Exponential {
                base: Duration::from_millis(10),
                max: Duration::from_millis(40)
            }
        );
    }
}
