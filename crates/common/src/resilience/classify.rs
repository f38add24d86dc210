//! Classify remote failures into retry verdicts and display messages.
//!
//! `default_should_retry` is the stock eligibility predicate; `classify`
//! maps a raw error to a user-presentable message. Classification is
//! advisory only: it never influences whether a call is retried.

use super::remote_error::RemoteError;

/// Fallback message when the backend returned no error object at all.
const UNKNOWN_ERROR: &str = "unknown error";

/// Fallback message when an error object carries no message.
const GENERIC_FAILURE: &str = "request failed, please try again";

/// Default retry-eligibility predicate: server errors (5xx) and timeouts.
///
/// 429 is deliberately absent here even though `classify` knows about it;
/// rate-limit retries are opt-in through a custom predicate.
pub fn default_should_retry(error: &RemoteError) -> bool {
    let server_error = error.status.is_some_and(|status| (500..600).contains(&status));
    let timeout = error.message.as_deref().is_some_and(|message| message.contains("timeout"));
    server_error || timeout
}

/// Derive a user-presentable message from a raw failure.
///
/// Pure and total: the same input always yields the same output, and no
/// input panics. Rules are evaluated in a fixed precedence order, first
/// match wins.
pub fn classify(error: Option<&RemoteError>) -> String {
    let Some(error) = error else {
        return UNKNOWN_ERROR.to_string();
    };

    match error.status {
        Some(503) => return "service temporarily unavailable, retrying".to_string(),
        Some(500) => return "server error, please retry shortly".to_string(),
        Some(429) => return "rate limited, wait before retrying".to_string(),
        _ => {}
    }

    let Some(message) = error.message.as_deref() else {
        return GENERIC_FAILURE.to_string();
    };

    if message.contains("NetworkError") || message.contains("Failed to fetch") {
        return "connection error, check network".to_string();
    }
    if message.contains("Email já cadastrado") {
        return "email already registered".to_string();
    }
    if message.contains("Email ou senha inválidos") {
        return "invalid email or password".to_string();
    }
    if message.contains("Password") {
        return "password error".to_string();
    }

    message.to_string()
}
