//! Error status - how an error should be handled

use std::fmt;

/// Whether an error is retryable.
///
/// - `Permanent`: retrying will not help, fail fast
/// - `Temporary`: transient condition, safe to retry with backoff
/// - `Persistent`: was temporary, but retries were exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// The error is not retryable
    Permanent,
    /// The error is transient and may succeed on retry
    Temporary,
    /// The error was temporary but persisted through retries
    Persistent,
}

impl ErrorStatus {
    /// Check if an operation hitting this status should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Transition after retries have been exhausted.
    ///
    /// Temporary becomes Persistent; other statuses are unchanged.
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        };
        write!(f, "{}", s)
    }
}
