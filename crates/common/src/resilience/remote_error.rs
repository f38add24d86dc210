//! Error payload returned by the remote boundary.
//!
//! The hosted backend reports failures as a loose object with an optional
//! HTTP status and message; anything else it attaches is carried through
//! untouched in `details`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw failure reported by a remote call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteError {
    /// HTTP status code, when the failure carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Backend-supplied message, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Backend-specific error code (e.g. PostgREST codes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Unrecognized backend detail, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl RemoteError {
    /// Failure identified only by an HTTP status.
    pub fn from_status(status: u16) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    /// Failure identified only by a message.
    pub fn from_message(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Self::default() }
    }

    /// Failure with both an HTTP status and a message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: Some(message.into()), ..Self::default() }
    }

    /// Attach a backend-specific error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach passthrough detail.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.message.as_deref()) {
            (Some(status), Some(message)) => write!(f, "HTTP {status}: {message}"),
            (Some(status), None) => write!(f, "HTTP {status}"),
            (None, Some(message)) => write!(f, "{message}"),
            (None, None) => write!(f, "unknown remote error"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Data-or-error pair returned by the result-carrying call convention.
///
/// Mirrors the backend client's own response shape: a query either produced
/// rows or an error, and callers inspect `error` before touching `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RemoteError>,
}

impl<T> QueryResult<T> {
    /// Successful result carrying data.
    pub fn ok(data: T) -> Self {
        Self { data: Some(data), error: None }
    }

    /// Successful result without rows (e.g. an update with no returning
    /// clause).
    pub fn empty() -> Self {
        Self { data: None, error: None }
    }

    /// Failed result.
    pub fn err(error: RemoteError) -> Self {
        Self { data: None, error: Some(error) }
    }

    /// Whether the pair carries an error.
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// Convert into a `Result`, treating an absent payload as a failure.
    pub fn into_result(self) -> Result<T, RemoteError> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (Some(data), None) => Ok(data),
            (None, None) => Err(RemoteError::from_message("no data returned")),
        }
    }
}
