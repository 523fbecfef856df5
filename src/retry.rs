use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// How a failed attempt should be treated.
#[derive(Debug)]
pub enum Attempt<E> {
    /// May succeed later. `after` is a delay the remote side asked for.
    Retry { error: E, after: Option<Duration> },
    /// Will never succeed; stop now.
    Abort(E),
}

impl<E> Attempt<E> {
    pub fn retry(error: E) -> Self {
        Attempt::Retry { error, after: None }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::fmt::Debug + std::fmt::Display> {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("aborted on attempt {attempts}: {error}")]
    Aborted { attempts: u32, error: E },
}

impl<E: std::fmt::Debug + std::fmt::Display> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Bounded exponential backoff.
///
/// Attempt `i` (0-based) that fails retryably waits `base_delay * 2^i`,
/// capped at `max_delay`. A delay requested by the server replaces the
/// computed one but is capped the same way.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    #[serde(with = "crate::config::secs")]
    pub base_delay: Duration,
    #[serde(with = "crate::config::secs")]
    pub max_delay: Duration,
    /// Spread each wait uniformly over `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        if self.jitter && !delay.is_zero() {
            let half = delay / 2;
            half + rand::thread_rng().gen_range(Duration::ZERO..=half)
        } else {
            delay
        }
    }

    fn wait_for(&self, attempt: u32, requested: Option<Duration>) -> Duration {
        match requested {
            Some(after) => after.min(self.max_delay),
            None => self.backoff(attempt),
        }
    }

    /// Run `op` until it succeeds, aborts, or the retry budget is spent.
    /// `op` receives the 0-based attempt number.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Attempt<E>>>,
        E: std::fmt::Debug + std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(Attempt::Abort(error)) => {
                    return Err(RetryError::Aborted {
                        attempts: attempt + 1,
                        error,
                    });
                }
                Err(Attempt::Retry { error, after }) if attempt < self.max_retries => {
                    let wait = self.wait_for(attempt, after);
                    debug!(attempt, %error, ?wait, "retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(Attempt::Retry { error, .. }) => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt + 1,
                        last: error,
                    });
                }
            }
        }
    }
}
