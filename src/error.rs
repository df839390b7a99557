//! # Error Types
//!
//! Comprehensive error handling for the relay core.
//!
//! This module defines all error variants that can occur while relaying
//! traffic, from low-level I/O errors to per-message decode problems.
//!
//! ## Error Categories
//! - **I/O Errors**: Socket and file system failures
//! - **Frame Errors**: Oversized frames, embedded delimiters
//! - **Decode Errors**: Unclassifiable or unparseable messages
//! - **Dispatch Errors**: Hook and command callback failures
//! - **Session Errors**: Connection establishment and teardown problems
//!
//! Only a remote connection failure is fatal to a session; every other
//! variant is caught at its origin, reported, and counted. No error in this
//! crate is allowed to crash the host process.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common error cases.
pub mod constants {
    /// A hook callback panicked inside the dispatcher
    pub const ERR_HOOK_PANICKED: &str = "hook callback panicked";

    /// A write was attempted on a sink whose peer is gone
    pub const ERR_SINK_CLOSED: &str = "destination socket is closed";

    /// The session has already reached its terminal state
    pub const ERR_SESSION_CLOSED: &str = "session is closed";

    /// Outbound frame text contains the wire delimiter
    pub const ERR_DELIMITER_IN_FRAME: &str = "frame contains the 0x00 delimiter";
}

/// RelayError is the primary error type for all relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("remote connection failed: {endpoint}: {source}")]
    ConnectionFailed {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("remote connection timed out: {endpoint}")]
    ConnectionTimeout { endpoint: String },

    #[error("frame exceeds maximum size: {0} bytes")]
    OversizedFrame(usize),

    #[error("{}", constants::ERR_DELIMITER_IN_FRAME)]
    DelimiterInFrame,

    #[error("unclassifiable frame")]
    UnclassifiableFrame,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("hook failed: {0}")]
    HookFailed(String),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("{}", constants::ERR_SESSION_CLOSED)]
    SessionClosed,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
