//! XPA transport layer.
//!
//! The transport is the black box that actually talks to XPA access points.
//! Everything above it (handle lifecycle, outcome classification) is
//! transport-agnostic and goes through [`XpaTransport`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Xpa (Rust)     │                              │  DS9            │
//! │                 │            XPA               │                 │
//! │  Connection-    │◄────────────────────────────►│  access point   │
//! │  Manager        │     xpans / inet / unix      │  "ds9"          │
//! │  → Transport    │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Primitives
//!
//! | Primitive | Result |
//! |-----------|--------|
//! | `open(mode)` | fresh [`XpaHandle`] or [`Error::Connection`](crate::Error::Connection) |
//! | `close(handle)` | releases the session |
//! | `get(handle, request)` | [`GetOutcome`] |
//! | `set(handle, request)` | [`SetOutcome`] |
//! | `set_fd(handle, request, fd)` | [`SetOutcome`] |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cli` | Transport driving the `xpaget`/`xpaset` tools |
//! | `stub` | Scripted in-memory transport for tests |

// ============================================================================
// Imports
// ============================================================================

#[cfg(unix)]
use std::os::fd::BorrowedFd;
use std::sync::Arc;

use crate::error::Result;
use crate::identifiers::XpaHandle;
use crate::protocol::{GetOutcome, Request, SetOutcome};

// ============================================================================
// Submodules
// ============================================================================

/// Transport driving the XPA command-line tools.
pub mod cli;

/// Scripted in-memory transport.
pub mod stub;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::CliTransport;
pub use stub::{CallKind, RecordedCall, StubTransport};

// ============================================================================
// XpaTransport
// ============================================================================

/// The primitive operations of an XPA transport.
///
/// Calls block until the access point answers or the transport gives up;
/// timeouts are the transport's own policy.
///
/// A failed call (`Err`) means the request could not be carried out
/// locally at all. A request that went out and found nobody is reported as
/// an outcome with `matches == 0`, not as an error.
pub trait XpaTransport: Send + Sync {
    /// Opens a new session.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`](crate::Error::Connection) with the transport's
    /// diagnostic if no session can be established.
    fn open(&self, mode: &str) -> Result<XpaHandle>;

    /// Closes a session. Closing an unknown handle is a no-op.
    fn close(&self, handle: XpaHandle);

    /// Issues a get request addressed to one responder.
    ///
    /// # Errors
    ///
    /// Local failures only (e.g. the handle is not open).
    fn get(&self, handle: XpaHandle, request: &Request<'_>) -> Result<GetOutcome>;

    /// Issues a set request carrying `request.payload`.
    ///
    /// # Errors
    ///
    /// Local failures only.
    fn set(&self, handle: XpaHandle, request: &Request<'_>) -> Result<SetOutcome>;

    /// Issues a set request whose payload is read from `fd`.
    ///
    /// The descriptor is borrowed; the transport must not close it.
    ///
    /// # Errors
    ///
    /// Local failures only.
    #[cfg(unix)]
    fn set_fd(
        &self,
        handle: XpaHandle,
        request: &Request<'_>,
        fd: BorrowedFd<'_>,
    ) -> Result<SetOutcome>;
}

impl<T: XpaTransport + ?Sized> XpaTransport for Arc<T> {
    #[inline]
    fn open(&self, mode: &str) -> Result<XpaHandle> {
        (**self).open(mode)
    }

    #[inline]
    fn close(&self, handle: XpaHandle) {
        (**self).close(handle);
    }

    #[inline]
    fn get(&self, handle: XpaHandle, request: &Request<'_>) -> Result<GetOutcome> {
        (**self).get(handle, request)
    }

    #[inline]
    fn set(&self, handle: XpaHandle, request: &Request<'_>) -> Result<SetOutcome> {
        (**self).set(handle, request)
    }

    #[cfg(unix)]
    #[inline]
    fn set_fd(
        &self,
        handle: XpaHandle,
        request: &Request<'_>,
        fd: BorrowedFd<'_>,
    ) -> Result<SetOutcome> {
        (**self).set_fd(handle, request, fd)
    }
}
