//! Conversions from external failures into domain errors.
//!
//! `RemoteError` and `FeiraError` live in different crates, so the orphan
//! rule rules out `From` impls here; an extension trait keeps the
//! conversion logic explicit and on the infrastructure side.

use feira_common::{classify, RemoteError};
use feira_domain::FeiraError;

/// Extension trait turning a raw remote failure into the domain error the
/// services surface to callers.
pub trait IntoFeiraError {
    fn into_feira(self) -> FeiraError;
}

impl IntoFeiraError for RemoteError {
    fn into_feira(self) -> FeiraError {
        let message = classify(Some(&self));

        match self.status {
            Some(404) => FeiraError::NotFound(message),
            Some(401 | 403) => FeiraError::Auth(message),
            Some(status) if status == 429 || status >= 500 => FeiraError::Network(message),
            Some(_) => FeiraError::InvalidInput(message),
            None if looks_like_connection_failure(&self) => FeiraError::Network(message),
            None => FeiraError::Internal(message),
        }
    }
}

fn looks_like_connection_failure(err: &RemoteError) -> bool {
    err.message.as_deref().is_some_and(|message| {
        message.contains("NetworkError")
            || message.contains("Failed to fetch")
            || message.contains("timeout")
    })
}

/// Map a transport-level HTTP failure into the raw error shape the
/// classifier understands.
///
/// Timeouts keep the word "timeout" in the message so the default retry
/// predicate matches; connection failures use the browser-style
/// "NetworkError" pattern the classifier recognizes.
pub fn transport_error(err: &reqwest::Error) -> RemoteError {
    let status = err.status().map(|s| s.as_u16());

    let message = if err.is_timeout() {
        "request timeout".to_string()
    } else if err.is_connect() {
        format!("NetworkError: failed to connect: {err}")
    } else {
        format!("Failed to fetch: {err}")
    };

    RemoteError { status, message: Some(message), ..RemoteError::default() }
}
