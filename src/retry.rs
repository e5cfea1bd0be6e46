//! Retry wrapper for individual API calls and downloads.
//!
//! The client never retries on its own; callers wrap whichever operation
//! they want retried with a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::sleep::Sleeper;

/// Default number of attempts: the initial one plus one retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Which failures qualify for a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Any error except cancellation.
    Any,
    /// Only transport-class errors (network, timeout, malformed body).
    TransportOnly,
}

/// Decision taken after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// How long to wait first.
        delay: Duration,
        /// Number of the upcoming attempt (1-indexed).
        attempt: u32,
    },
    /// Give up and surface the error.
    DoNotRetry,
}

/// Retry configuration.
///
/// # Default Values
///
/// - `max_attempts`: 2
/// - `delay`: none
/// - `retry_on`: [`RetryOn::Any`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
            retry_on: RetryOn::Any,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration, retry_on: RetryOn) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retry_on,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, RetryOn::Any)
    }

    /// Returns the maximum number of attempts, the first one included.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Decides whether to retry after `attempt` (1-indexed) failed with `error`.
    #[must_use]
    pub fn should_retry(&self, error: &Error, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts || matches!(error, Error::Cancelled) {
            return RetryDecision::DoNotRetry;
        }
        let qualifies = match self.retry_on {
            RetryOn::Any => true,
            RetryOn::TransportOnly => error.is_transport(),
        };
        if qualifies {
            RetryDecision::Retry {
                delay: self.delay,
                attempt: attempt + 1,
            }
        } else {
            RetryDecision::DoNotRetry
        }
    }

    /// Runs `op` until it succeeds or the policy gives up.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn run<S, F, Fut, R>(&self, sleeper: &S, what: &str, op: F) -> Result<R>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        self.run_cancellable(sleeper, None, what, op).await
    }

    /// Like [`run`](Self::run), but a cancelled `cancellation` token cuts the
    /// pause between attempts short.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, or [`Error::Cancelled`] when
    /// cancelled while waiting to retry.
    pub async fn run_cancellable<S, F, Fut, R>(
        &self,
        sleeper: &S,
        cancellation: Option<&CancellationToken>,
        what: &str,
        mut op: F,
    ) -> Result<R>
    where
        S: Sleeper + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) => match self.should_retry(&error, attempt) {
                    RetryDecision::Retry {
                        delay,
                        attempt: next,
                    } => {
                        log::warn!("{what} failed, retrying (attempt {next}/{}): {error}", self.max_attempts);
                        if !delay.is_zero() {
                            match cancellation {
                                Some(token) => tokio::select! {
                                    () = sleeper.sleep(delay) => {}
                                    () = token.cancelled() => return Err(Error::Cancelled),
                                },
                                None => sleeper.sleep(delay).await,
                            }
                        }
                        attempt = next;
                    }
                    RetryDecision::DoNotRetry => return Err(error),
                },
            }
        }
    }
}
