//! Process-wide connector.
//!
//! The free functions here talk to DS9 through one shared
//! [`Xpa<CliTransport>`](Xpa), built from the tools on `PATH` the first
//! time a request needs it. They mirror the methods on [`Xpa`].
//!
//! # Lifecycle
//!
//! | Event | Effect |
//! |-------|--------|
//! | first request | connector built, shared handle opened |
//! | later requests | same handle reused |
//! | [`reset()`] | handle closed; next request opens a fresh one |
//!
//! Statics are never dropped, so a process that wants its handle closed
//! before exit calls [`reset()`] once on the way out. Calling it again, or
//! before any request, does nothing.

// ============================================================================
// Imports
// ============================================================================

#[cfg(unix)]
use std::os::fd::AsFd;
use std::sync::OnceLock;

use tracing::debug;

use crate::client::Xpa;
use crate::error::{Error, Result};
use crate::identifiers::XpaHandle;
use crate::transport::CliTransport;

// ============================================================================
// Shared Connector
// ============================================================================

static SHARED: OnceLock<Xpa<CliTransport>> = OnceLock::new();

/// Returns the process-wide connector, building it on first use.
///
/// # Errors
///
/// [`Error::Connection`] if the XPA tools cannot be found.
pub fn shared() -> Result<&'static Xpa<CliTransport>> {
    if let Some(xpa) = SHARED.get() {
        return Ok(xpa);
    }

    let xpa = Xpa::builder()
        .build()
        .map_err(|e| Error::connection(e.to_string()))?;

    // A racing builder may have won; the loser never opened a session.
    let xpa = SHARED.get_or_init(|| xpa);
    debug!("Process-wide XPA connector ready");
    Ok(xpa)
}

// ============================================================================
// Requests
// ============================================================================

/// [`Xpa::get`] on the process-wide connector.
///
/// # Errors
///
/// As [`Xpa::get`], plus [`shared()`] failures.
pub fn get(handle: Option<XpaHandle>, target: &str, params: &str, mode: &str) -> Result<String> {
    shared()?.get(handle, target, params, mode)
}

/// [`Xpa::get_bytes`] on the process-wide connector.
///
/// # Errors
///
/// As [`Xpa::get_bytes`], plus [`shared()`] failures.
pub fn get_bytes(
    handle: Option<XpaHandle>,
    target: &str,
    params: &str,
    mode: &str,
) -> Result<Vec<u8>> {
    shared()?.get_bytes(handle, target, params, mode)
}

/// [`Xpa::set`] on the process-wide connector.
///
/// # Errors
///
/// As [`Xpa::set`], plus [`shared()`] failures.
pub fn set(
    handle: Option<XpaHandle>,
    target: &str,
    params: &str,
    mode: &str,
    buf: &[u8],
    len: Option<usize>,
) -> Result<String> {
    shared()?.set(handle, target, params, mode, buf, len)
}

/// [`Xpa::set_fd`] on the process-wide connector.
///
/// # Errors
///
/// As [`Xpa::set_fd`], plus [`shared()`] failures.
#[cfg(unix)]
pub fn set_fd(
    handle: Option<XpaHandle>,
    target: &str,
    params: &str,
    mode: &str,
    fd: impl AsFd,
) -> Result<String> {
    shared()?.set_fd(handle, target, params, mode, fd)
}

/// Closes the process-wide shared handle, if any.
///
/// Never builds the connector.
pub fn reset() {
    if let Some(xpa) = SHARED.get() {
        xpa.reset();
    }
}

// ============================================================================
// Tests
// ============================================================================
