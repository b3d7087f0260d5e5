//! Backoff interval computation (§4.5).

use std::time::Duration;

/// Abstraction for computing the delay before a retry attempt.
pub trait IntervalFunction: Send + Sync {
    /// `attempt` is 0-indexed: the delay between attempt 0 and attempt 1
    /// is `next_interval(0)`.
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.duration
    }
}

/// `delay(k) = min(initial_delay * backoff_factor^k, max_delay)`, optionally
/// randomized by ±25% to avoid synchronized retry storms across clients.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    backoff_factor: f64,
    max_delay: Duration,
    jitter: bool,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, backoff_factor: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            backoff_factor,
            max_delay,
            jitter: true,
        }
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    fn base_delay(&self, attempt: usize) -> Duration {
        let multiplier = self.backoff_factor.powi(attempt as i32);
        self.initial_delay.mul_f64(multiplier).min(self.max_delay)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let base = self.base_delay(attempt);
        if !self.jitter {
            return base;
        }
        // delay <- max(0, delay + delay * 0.25 * (2U - 1)), U ~ Uniform[0, 1)
        use rand::Rng;
        let secs = base.as_secs_f64();
        let delta = secs * 0.25;
        let randomized = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));
        Duration::from_secs_f64(randomized.max(0.0))
    }
}
