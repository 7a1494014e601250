//! Validation error type shared across crates.
//!
//! Malformed or out-of-range input is surfaced to the caller verbatim and
//! never retried. Transport-level schema checking happens before requests
//! reach this code, but defaults and range checks are applied here anyway.

/// A rejected input value with a caller-facing description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid input: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
