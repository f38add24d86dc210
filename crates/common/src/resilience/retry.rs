//! Retry executor with exponential backoff.
//!
//! Drives repeated invocation of a caller-supplied remote operation,
//! consulting the classifier's retry predicate after each failure, sleeping
//! with exponentially increasing delay, and terminating on success, a
//! non-retryable error, or attempt-budget exhaustion.
//!
//! Two call conventions are supported: [`RetryExecutor::execute`] for
//! operations returning `Result<T, RemoteError>` (the last error is
//! surfaced unchanged after exhaustion) and [`RetryExecutor::execute_query`]
//! for operations returning a [`QueryResult`] pair (the last pair is
//! returned without conversion, matching the backend client's own shape).

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, warn};

use super::classify::{classify, default_should_retry};
use super::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY,
    MAX_BACKOFF_EXPONENT,
};
use super::remote_error::{QueryResult, RemoteError};

/// Errors raised for misconfigured retry parameters.
///
/// These are programmer errors surfaced at construction time; they are never
/// retried or classified, and they are distinct from remote-call failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    #[error("Invalid retry configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl RetryError {
    fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration { message: message.into() }
    }
}

/// Type alias for the custom retry predicate.
type ErrorPredicate = Arc<dyn Fn(&RemoteError) -> bool + Send + Sync>;

/// Condition deciding whether a failed attempt is eligible for retry.
pub enum RetryCondition {
    /// Use [`default_should_retry`]: 5xx statuses and timeout messages.
    Default,
    /// Caller-supplied predicate over the raw error.
    Custom(ErrorPredicate),
}

impl RetryCondition {
    fn allows(&self, error: &RemoteError) -> bool {
        match self {
            Self::Default => default_should_retry(error),
            Self::Custom(predicate) => predicate(error),
        }
    }
}

impl Clone for RetryCondition {
    fn clone(&self) -> Self {
        match self {
            Self::Default => Self::Default,
            Self::Custom(predicate) => Self::Custom(Arc::clone(predicate)),
        }
    }
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl Default for RetryCondition {
    fn default() -> Self {
        Self::Default
    }
}

/// Immutable configuration for retry behavior.
///
/// Constructed once per call site, merged over defaults field-by-field via
/// [`RetryConfig::builder`], and discarded after the call completes.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (≥ 1).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the backoff delay (≥ `initial_delay`).
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry (> 1).
    pub backoff_multiplier: f64,
    /// Retry-eligibility condition consulted after each failure.
    pub retry_on: RetryCondition,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            retry_on: RetryCondition::default(),
        }
    }
}

impl RetryConfig {
    /// Start a builder seeded with the defaults; unset fields keep them.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `RetryError::InvalidConfiguration` when `max_attempts` is
    /// zero, `max_delay` is below `initial_delay`, or the multiplier does
    /// not grow the delay.
    pub fn validate(&self) -> Result<(), RetryError> {
        if self.max_attempts == 0 {
            return Err(RetryError::config("max_attempts must be at least 1"));
        }
        if self.max_delay < self.initial_delay {
            return Err(RetryError::config(format!(
                "max_delay ({:?}) cannot be less than initial_delay ({:?})",
                self.max_delay, self.initial_delay
            )));
        }
        if self.backoff_multiplier <= 1.0 {
            return Err(RetryError::config(format!(
                "backoff_multiplier must be greater than 1, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }

    /// Delay before retry number `retry_index` (0-based: the wait after the
    /// first failed attempt has index 0 and equals `initial_delay`).
    ///
    /// Each subsequent wait is multiplied by `backoff_multiplier` and capped
    /// at `max_delay`.
    pub fn delay_before_retry(&self, retry_index: u32) -> Duration {
        let exponent = retry_index.min(MAX_BACKOFF_EXPONENT);
        let raw = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(exponent as i32);
        let capped = raw.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    fn should_retry(&self, error: &RemoteError) -> bool {
        self.retry_on.allows(error)
    }
}

/// Builder for [`RetryConfig`] that merges overrides over the defaults.
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    /// Set the maximum number of attempts (including the first).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Set the upper bound on the backoff delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Set the delay multiplier.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    /// Replace the retry condition with a custom predicate.
    pub fn retry_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RemoteError) -> bool + Send + Sync + 'static,
    {
        self.config.retry_on = RetryCondition::Custom(Arc::new(predicate));
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    /// See [`RetryConfig::validate`].
    pub fn build(self) -> Result<RetryConfig, RetryError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Executor driving sequential attempts of a remote operation.
///
/// Holds no external resources; the waits are cooperative
/// (`tokio::time::sleep`), so the owning task may be cancelled at any
/// suspension point with nothing to clean up.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self { config: RetryConfig::default() }
    }
}

impl RetryExecutor {
    /// Create an executor with a validated configuration.
    ///
    /// # Errors
    /// Returns `RetryError::InvalidConfiguration` for out-of-range fields;
    /// this is the fail-fast path for programmer misuse.
    pub fn new(config: RetryConfig) -> Result<Self, RetryError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this executor runs with.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation that surfaces failures as `Err`.
    ///
    /// Returns the success value from the first attempt that completes, or
    /// the *last* error after a non-retryable failure or attempt-budget
    /// exhaustion. The error is surfaced unchanged; no synthetic "gave up"
    /// error is introduced.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1u32;

        loop {
            debug!(attempt, max_attempts, "executing remote operation");

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "remote operation succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if self.settle_failure(&err, attempt).await.is_break() {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Execute an operation returning a data-or-error pair.
    ///
    /// A pair without an error is a success and is returned immediately.
    /// Otherwise the predicate decides whether to retry; the last pair is
    /// returned as-is after exhaustion or a non-retryable verdict, so
    /// callers inspect the same shape they would have seen on a
    /// first-attempt failure.
    pub async fn execute_query<F, Fut, T>(&self, mut operation: F) -> QueryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = QueryResult<T>>,
    {
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1u32;

        loop {
            debug!(attempt, max_attempts, "executing remote query");

            let result = operation().await;
            let Some(err) = result.error.as_ref() else {
                if attempt > 1 {
                    debug!(attempt, "remote query succeeded after retries");
                }
                return result;
            };

            if self.settle_failure(err, attempt).await.is_break() {
                return result;
            }
            attempt += 1;
        }
    }

    /// Log the failure, decide whether to keep going, and perform the wait.
    ///
    /// Returns `Break` when the caller should surface the failure (either
    /// the verdict was non-retryable or the attempt budget is spent).
    async fn settle_failure(&self, err: &RemoteError, attempt: u32) -> std::ops::ControlFlow<()> {
        let max_attempts = self.config.max_attempts;
        let retryable = self.config.should_retry(err);
        let classified = classify(Some(err));

        if !retryable {
            debug!(
                attempt,
                max_attempts,
                error = %err,
                classified = %classified,
                "remote failure is not retryable"
            );
            return std::ops::ControlFlow::Break(());
        }
        if attempt >= max_attempts {
            error!(
                attempt,
                max_attempts,
                error = %err,
                classified = %classified,
                "all retry attempts exhausted"
            );
            return std::ops::ControlFlow::Break(());
        }

        let delay = self.config.delay_before_retry(attempt - 1);
        warn!(
            attempt,
            max_attempts,
            retryable,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            classified = %classified,
            "remote attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
        std::ops::ControlFlow::Continue(())
    }
}

/// Convenience wrapper: execute a failing-`Result` operation with the
/// default configuration.
pub async fn retry_with_backoff<F, Fut, T>(operation: F) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    RetryExecutor::default().execute(operation).await
}

/// Convenience wrapper: execute a data-or-error query with the default
/// configuration.
pub async fn retry_query<F, Fut, T>(operation: F) -> QueryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = QueryResult<T>>,
{
    RetryExecutor::default().execute_query(operation).await
}
