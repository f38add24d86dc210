//! Application configuration structures
//!
//! Loaded by `feira-infra::config` from environment variables or files.

use serde::{Deserialize, Serialize};

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend project (e.g. `https://xyz.supabase.co`).
    pub url: String,
    /// Anonymous API key sent with every request.
    pub anon_key: String,
}

impl BackendConfig {
    /// Whether enough configuration is present to talk to the backend.
    ///
    /// Mirrors the app-level gate that downgrades every remote feature to a
    /// configuration error instead of issuing doomed requests.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

/// Retry knobs applied to remote calls.
///
/// These are plain wire-format values; `feira-common` turns them into a
/// validated `RetryConfig` at call time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay_ms: 1000, max_delay_ms: 10_000, backoff_multiplier: 2.0 }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Config {
    /// Whether the backend section is usable.
    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }
}
