//! Common utilities shared across Feira crates.
//!
//! The crate currently hosts the resilience subsystem: the retry executor
//! and error classification that every remote call in the application
//! funnels through.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod resilience;

// Re-export commonly used types and traits for convenience
pub use resilience::{
    classify, default_should_retry, retry_query, retry_with_backoff, QueryResult, RemoteError,
    RetryCondition, RetryConfig, RetryConfigBuilder, RetryError, RetryExecutor,
};
