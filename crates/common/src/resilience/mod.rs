//! Resilient remote-call layer
//!
//! This module encapsulates error classification (retry-eligibility verdicts
//! plus user-presentable messages) and exponential backoff execution so that
//! higher layers (auth, products, orders, storage) share a consistent policy.

pub mod classify;
pub mod constants;
pub mod remote_error;
pub mod retry;

pub use classify::{classify, default_should_retry};
pub use remote_error::{QueryResult, RemoteError};
pub use retry::{
    retry_query, retry_with_backoff, RetryCondition, RetryConfig, RetryConfigBuilder, RetryError,
    RetryExecutor,
};
