//! Retry with exponential, jittered backoff.
//!
//! Attempt `n` (0-indexed) that fails with a retryable error waits
//! `2^n * base_delay * U` before attempt `n + 1`, with `U` uniform in
//! `[0.5, 1.0]`. Jitter only shortens the wait, so worst-case latency never
//! exceeds the plain exponential schedule while concurrent callers spread out.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{debug, warn};

use wxgate_core::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY, JITTER_MAX, JITTER_MIN,
};
use wxgate_core::error::{Result, WeatherError};

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `max_retries + 1` attempts in total.
    pub max_retries: u32,
    /// Backoff unit.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay after failed attempt `attempt` for a given jitter factor.
    ///
    /// The factor is clamped to `[0.5, 1.0]`; NaN counts as `1.0`. A zero base
    /// delay never waits, however large `attempt` grows.
    pub fn delay_for(&self, attempt: u32, jitter: f64) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = if jitter.is_nan() {
            JITTER_MAX
        } else {
            jitter.clamp(JITTER_MIN, JITTER_MAX)
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * 2f64.powi(exponent) * factor;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Delay after failed attempt `attempt` with a freshly drawn jitter factor.
    pub fn jittered_delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        self.delay_for(attempt, rng.gen_range(JITTER_MIN..=JITTER_MAX))
    }

    /// Next state after attempt `attempt` failed with `error`.
    pub fn next_state(&self, attempt: u32, error: &WeatherError) -> RetryState {
        if !error.is_retryable() || attempt >= self.max_retries {
            RetryState::FailedTerminal
        } else {
            RetryState::Attempting(attempt + 1)
        }
    }
}

/// States of one retry loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryState {
    /// Running attempt `n` (0-indexed).
    Attempting(u32),
    /// An attempt returned a value.
    Succeeded,
    /// A non-retryable error, or the retry budget is spent.
    FailedTerminal,
}

/// Result of a retry loop plus how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The successful value or the last error seen, unchanged.
    pub result: Result<T>,
    /// Attempts made, at least one.
    pub attempts: u32,
}

impl<T> RetryOutcome<T> {
    /// Terminal state the loop ended in.
    pub fn state(&self) -> RetryState {
        match self.result {
            Ok(_) => RetryState::Succeeded,
            Err(_) => RetryState::FailedTerminal,
        }
    }
}

/// Executes fallible async operations under a [`RetryPolicy`].
pub struct Retrier {
    policy: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl Retrier {
    /// Creates a retrier with an entropy-seeded jitter source.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a retrier with a reproducible jitter source.
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails terminally, or the budget runs out.
    ///
    /// `operation` receives the 0-indexed attempt number. The returned error
    /// is always the one produced by the last attempt.
    pub async fn run<F, Fut, T>(&self, name: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = %name,
                            attempts = attempt + 1,
                            "Succeeded after retry"
                        );
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt + 1,
                    };
                }
                Err(error) => error,
            };

            match self.policy.next_state(attempt, &error) {
                RetryState::Attempting(next) => {
                    let delay = {
                        let mut rng = self.rng.lock();
                        self.policy.jittered_delay(attempt, &mut *rng)
                    };
                    debug!(
                        operation = %name,
                        attempt = attempt + 1,
                        kind = %error.kind(),
                        delay_ms = delay.as_millis() as u64,
                        retry_after_s = error.retry_after().map(|d| d.as_secs()),
                        "Retryable failure, backing off"
                    );
                    sleep(delay).await;
                    attempt = next;
                }
                RetryState::Succeeded | RetryState::FailedTerminal => {
                    if error.is_retryable() {
                        warn!(
                            operation = %name,
                            attempts = attempt + 1,
                            error = %error,
                            "Retries exhausted"
                        );
                    }
                    return RetryOutcome {
                        result: Err(error),
                        attempts: attempt + 1,
                    };
                }
            }
        }
    }
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
