// Constants for the resilience module
use std::time::Duration;

/// Default maximum number of attempts (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound on the backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(10_000);

/// Default multiplier applied to the delay after each retry.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Maximum exponent used when computing exponential delays, to bound the
/// intermediate floating point value.
pub const MAX_BACKOFF_EXPONENT: u32 = 30;
