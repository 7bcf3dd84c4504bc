//! # Exponential Backoff
//!
//! Provides an exponential backoff with jitter for retrying node patches.
//!
//! Each delay is the previous one multiplied by `multiplier`, capped at
//! `max_interval`, then randomized by `randomization_factor`. With the
//! defaults the unjittered sequence is 0.5s, 0.75s, 1.125s, 1.6875s, ...
//! The whole retry loop is bounded by `max_elapsed`.

use std::time::Duration;

/// Retry policy for a single patch invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// First delay between attempts
    pub initial_interval: Duration,
    /// Growth factor applied after each delay
    pub multiplier: f64,
    /// Jitter in `[0.0, 1.0)`; a delay `d` is drawn from `[d*(1-f), d*(1+f)]`
    pub randomization_factor: f64,
    /// Upper bound on a single unjittered delay
    pub max_interval: Duration,
    /// Total time budget, attempts and delays included
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(60),
            max_elapsed: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    /// Same policy with jitter disabled.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    /// Same policy with a different total budget.
    #[must_use]
    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Fresh backoff state for one invocation.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self)
    }
}

/// Exponential backoff calculator
///
/// Stateful: each call to [`ExponentialBackoff::next_backoff`] advances the
/// sequence. Create one per retried operation.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    current_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Duration,
}

impl ExponentialBackoff {
    /// Create a backoff from a policy
    ///
    /// A multiplier below 1.0 or not finite is treated as 1.0. A jitter
    /// factor outside `[0.0, 1.0]` is clamped; NaN disables jitter.
    #[must_use]
    pub fn new(policy: &RetryPolicy) -> Self {
        let multiplier = if policy.multiplier.is_finite() && policy.multiplier >= 1.0 {
            policy.multiplier
        } else {
            1.0
        };
        let randomization_factor = if policy.randomization_factor.is_nan() {
            0.0
        } else {
            policy.randomization_factor.clamp(0.0, 1.0)
        };

        Self {
            current_interval: policy.initial_interval.min(policy.max_interval),
            multiplier,
            randomization_factor,
            max_interval: policy.max_interval,
        }
    }

    /// Get the next delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = jitter(self.current_interval, self.randomization_factor);

        self.current_interval = if self.current_interval.as_secs_f64() * self.multiplier
            >= self.max_interval.as_secs_f64()
        {
            self.max_interval
        } else {
            self.current_interval.mul_f64(self.multiplier)
        };

        delay
    }
}

fn jitter(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 {
        return interval;
    }
    // uniform in [1 - factor, 1 + factor]
    let scale = 1.0 - factor + 2.0 * factor * rand::random::<f64>();
    interval.mul_f64(scale)
}
