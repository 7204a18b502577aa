//! # greenloop-error
//!
//! Unified error handling for greenloop - following OpenDAL's error handling practices.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., SandboxViolation, ApiFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use greenloop_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::SandboxViolation, "path escapes the sandbox root")
//!         .with_operation("sandbox::resolve")
//!         .with_context("path", "../../etc/passwd"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, greenloop_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using greenloop Error
pub type Result<T> = std::result::Result<T, Error>;
