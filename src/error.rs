//! Error types for the XPA connector.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ds9_xpa::{Error, Result, Xpa};
//!
//! fn current_frame(xpa: &Xpa) -> Result<String> {
//!     xpa.get(None, "ds9", "frame", "")
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::XpaToolNotFound`] |
//! | Connection | [`Error::Connection`] |
//! | Transport | [`Error::NoResponse`], [`Error::EmptyResponse`] |
//! | Request | [`Error::InvalidArgument`], [`Error::Protocol`] |
//! | External | [`Error::Io`], [`Error::Encoding`] |
//!
//! A protocol error reported by DS9 is *not* an [`Error`] on the
//! string-returning request wrappers; it comes back as ordinary reply text.
//! [`Error::Protocol`] is only produced when a caller opts into the strict
//! contract via [`Reply::into_result`](crate::Reply::into_result).

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;
use std::string::FromUtf8Error;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when connector configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// XPA command-line tool not found at path.
    ///
    /// Returned when an explicitly configured `xpaget`/`xpaset` does not exist.
    #[error("XPA tool not found at: {path}")]
    XpaToolNotFound {
        /// Path where the tool was expected.
        path: PathBuf,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The shared XPA handle could not be opened.
    ///
    /// Not retried; retry policy belongs to the caller.
    #[error("Unable to open XPA: {message}")]
    Connection {
        /// Diagnostic reported by the transport.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// No access point matched the request's target template.
    #[error("{operation} returned 0: no response from {target}")]
    NoResponse {
        /// Transport operation that was issued.
        operation: &'static str,
        /// Target template the request was addressed to.
        target: String,
    },

    /// A responder answered a get request with no payload and no error.
    #[error("{operation} returned a null buffer from {target}")]
    EmptyResponse {
        /// Transport operation that was issued.
        operation: &'static str,
        /// Target template the request was addressed to.
        target: String,
    },

    // ========================================================================
    // Request Errors
    // ========================================================================
    /// Invalid argument passed to a request.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Error text reported by the remote access point.
    #[error("XPA: {message}")]
    Protocol {
        /// Error text as reported by the responder.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Reply payload was not valid UTF-8.
    #[error("Reply is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an XPA tool not found error.
    #[inline]
    pub fn xpa_tool_not_found(path: impl Into<PathBuf>) -> Self {
        Self::XpaToolNotFound { path: path.into() }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a no response error.
    #[inline]
    pub fn no_response(operation: &'static str, target: impl Into<String>) -> Self {
        Self::NoResponse {
            operation,
            target: target.into(),
        }
    }

    /// Creates an empty response error.
    #[inline]
    pub fn empty_response(operation: &'static str, target: impl Into<String>) -> Self {
        Self::EmptyResponse {
            operation,
            target: target.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the shared handle could not be opened.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if a request reached the transport but got no usable answer.
    ///
    /// Upstream this usually means "reconnect" for [`Error::NoResponse`]
    /// and "retry" for [`Error::EmptyResponse`].
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::NoResponse { .. } | Self::EmptyResponse { .. })
    }

    /// Returns `true` if this is a remote error reported by the access point.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("no xpaset on PATH");
        assert_eq!(err.to_string(), "Unable to open XPA: no xpaset on PATH");
    }

    #[test]
    fn test_no_response_display() {
        let err = Error::no_response("XPAGet", "ds9");
        assert_eq!(err.to_string(), "XPAGet returned 0: no response from ds9");
    }

    #[test]
    fn test_empty_response_display() {
        let err = Error::empty_response("XPAGet", "ds9");
        assert_eq!(err.to_string(), "XPAGet returned a null buffer from ds9");
    }

    #[test]
    fn test_is_transport_error() {
        assert!(Error::no_response("XPASet", "ds9").is_transport_error());
        assert!(Error::empty_response("XPAGet", "ds9").is_transport_error());
        assert!(!Error::connection("test").is_transport_error());
        assert!(!Error::protocol("XPA$ERROR").is_transport_error());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(!Error::no_response("XPAGet", "ds9").is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::protocol("unknown command").is_protocol_error());
        assert!(!Error::invalid_argument("len").is_protocol_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "xpaget");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_utf8_error() {
        let utf8_err = String::from_utf8(vec![0xff, 0xfe]).unwrap_err();
        let err: Error = utf8_err.into();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
