//! Error kinds for greenloop operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Sandbox errors
    // =========================================================================
    /// A path escaped the sandbox root or targeted a protected file
    SandboxViolation,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Upstream API errors
    // =========================================================================
    /// Network error reaching the model endpoint
    NetworkFailed,

    /// Rate limit exceeded (HTTP 429)
    RateLimited,

    /// Upstream returned a server error (HTTP 5xx)
    UpstreamUnavailable,

    /// The API rejected the request with a non-retryable status
    ApiFailed,

    // =========================================================================
    // Tool errors
    // =========================================================================
    /// Unknown tool name requested by the model
    ToolUnknown,

    /// Failed to launch or wait on an external process
    ProcessFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,

    /// Serialization/deserialization failed
    SerializationFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Sandbox
            ErrorKind::SandboxViolation => "SandboxViolation",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Upstream
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::UpstreamUnavailable => "UpstreamUnavailable",
            ErrorKind::ApiFailed => "ApiFailed",

            // Tool
            ErrorKind::ToolUnknown => "ToolUnknown",
            ErrorKind::ProcessFailed => "ProcessFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailed | ErrorKind::RateLimited | ErrorKind::UpstreamUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
