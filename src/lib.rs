//! DS9 XPA - connector to the SAOImage DS9 image display tool.
//!
//! This library keeps one lazily opened, reusable XPA handle to DS9 and
//! exposes three request primitives on it:
//!
//! - `get` - retrieve data from an access point
//! - `set` - send a buffer to an access point
//! - `set_fd` - send the contents of a file descriptor
//!
//! # Architecture
//!
//! ```text
//! caller ──► Xpa::get/set/set_fd ──► ConnectionManager::acquire ──► XpaTransport
//!                  │                        (shared "w" handle)          │
//!                  ◄──────── Reply / Error ◄── outcome classification ◄──┘
//! ```
//!
//! Key design principles:
//!
//! - At most one implicitly managed handle per connector; opened on first
//!   use, reused until [`Xpa::reset`]
//! - Explicit handles bypass the shared one entirely
//! - "Nobody answered" and "answered with nothing" are errors; a responder's
//!   own error text is returned as data (or raised via [`Reply::into_result`])
//! - The transport is a trait; [`CliTransport`] drives `xpaget`/`xpaset`,
//!   [`StubTransport`] is scripted for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use ds9_xpa::{Result, Xpa};
//!
//! fn main() -> Result<()> {
//!     let xpa = Xpa::builder().build()?;
//!
//!     let frame = xpa.get(None, "ds9", "frame", "")?;
//!     println!("Current frame: {}", frame.trim());
//!
//!     let reply = xpa.set(None, "ds9", "frame 2", "", b"", None)?;
//!     if !reply.is_empty() {
//!         eprintln!("DS9 said: {reply}");
//!     }
//!
//!     xpa.reset();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Xpa`], [`ConnectionManager`], [`XpaBuilder`], options |
//! | [`command`] | Batched DS9 commands |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`global`] | Process-wide connector functions |
//! | [`identifiers`] | [`XpaHandle`] |
//! | [`protocol`] | Request, outcome and reply types |
//! | [`transport`] | [`XpaTransport`] and its implementations |

// ============================================================================
// Modules
// ============================================================================

/// XPA connector: handle lifecycle and request wrappers.
///
/// Use [`Xpa::builder()`] for a command-line backed connector or
/// [`Xpa::with_transport`] for any other transport.
pub mod client;

/// Batched DS9 commands.
pub mod command;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Process-wide connector.
pub mod global;

/// Type-safe identifiers for XPA sessions.
pub mod identifiers;

/// Request, outcome and reply types.
pub mod protocol;

/// XPA transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    CliOptions, ConnectionManager, DEFAULT_ACCESS_POINT, OPEN_MODE, Xpa, XpaBuilder,
    access_point, parse_access_point,
};

// Command types
pub use command::{CommandBuffer, Commander, XPA_SZ_LINE};

// Error types
pub use error::{Error, Result};

// Process-wide functions
#[cfg(unix)]
pub use global::set_fd;
pub use global::{get, get_bytes, reset, set, shared};

// Identifier types
pub use identifiers::XpaHandle;

// Protocol types
pub use protocol::{GetOutcome, Reply, Request, SetOutcome};

// Transport types
pub use transport::{CallKind, CliTransport, RecordedCall, StubTransport, XpaTransport};
