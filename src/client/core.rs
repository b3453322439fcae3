//! XPA connector and request wrappers.
//!
//! [`Xpa`] ties a transport to its [`ConnectionManager`] and exposes the
//! request wrappers. Every wrapper takes an optional explicit handle; with
//! `None` the shared handle is used (and opened on first use).
//!
//! # Return Contract
//!
//! | Outcome | `get` | `set` / `set_fd` |
//! |---------|-------|------------------|
//! | nobody matched | [`Error::NoResponse`](crate::Error::NoResponse) | [`Error::NoResponse`](crate::Error::NoResponse) |
//! | responder error | error text as `Ok` | error text as `Ok` |
//! | no payload | [`Error::EmptyResponse`](crate::Error::EmptyResponse) | `Ok("")` |
//! | payload | payload as `Ok` | `Ok("")` |
//!
//! The `request_*` variants return the tagged [`Reply`] instead, and
//! [`Reply::into_result`] turns responder errors into
//! [`Error::Protocol`](crate::Error::Protocol).
//!
//! # Example
//!
//! ```no_run
//! use ds9_xpa::Xpa;
//!
//! # fn example() -> ds9_xpa::Result<()> {
//! let xpa = Xpa::builder().build()?;
//!
//! let frame = xpa.get(None, "ds9", "frame", "")?;
//! xpa.set(None, "ds9", "regions", "", b"circle 100 100 20", None)?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
#[cfg(unix)]
use std::os::fd::AsFd;

use tracing::trace;

use crate::error::Result;
use crate::identifiers::XpaHandle;
use crate::protocol::{Reply, Request, SET_OPERATION};
#[cfg(unix)]
use crate::protocol::SET_FD_OPERATION;
use crate::transport::{CliTransport, XpaTransport};

use super::builder::XpaBuilder;
use super::manager::ConnectionManager;

// ============================================================================
// Xpa
// ============================================================================

/// Connector to DS9 over XPA.
///
/// Owns the shared handle for its transport; dropping the connector closes
/// the handle if one is open. Explicit handles passed to the wrappers are
/// never opened or closed here.
pub struct Xpa<T: XpaTransport = CliTransport> {
    /// Shared handle lifecycle.
    manager: ConnectionManager<T>,
}

impl<T: XpaTransport> fmt::Debug for Xpa<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Xpa")
            .field("manager", &self.manager)
            .finish()
    }
}

// ============================================================================
// Xpa - Constructors
// ============================================================================

impl Xpa<CliTransport> {
    /// Creates a configuration builder for a command-line backed connector.
    #[inline]
    #[must_use]
    pub fn builder() -> XpaBuilder {
        XpaBuilder::new()
    }
}

impl<T: XpaTransport> Xpa<T> {
    /// Creates a connector over any transport.
    #[inline]
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self {
            manager: ConnectionManager::new(transport),
        }
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        self.manager.transport()
    }

    /// Returns the shared handle manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }
}

// ============================================================================
// Xpa - Handle Lifecycle
// ============================================================================

impl<T: XpaTransport> Xpa<T> {
    /// Returns the shared handle, opening it on first use.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`](crate::Error::Connection) if it cannot be opened.
    #[inline]
    pub fn acquire(&self) -> Result<XpaHandle> {
        self.manager.acquire()
    }

    /// Closes the shared handle; the next request opens a fresh one.
    #[inline]
    pub fn reset(&self) {
        self.manager.reset();
    }

    fn resolve(&self, handle: Option<XpaHandle>) -> Result<XpaHandle> {
        match handle {
            Some(handle) => Ok(handle),
            None => self.manager.acquire(),
        }
    }
}

// ============================================================================
// Xpa - Tagged Requests
// ============================================================================

impl<T: XpaTransport> Xpa<T> {
    /// Issues a get request and classifies the answer.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`](crate::Error::Connection) if the shared handle cannot be opened
    /// - [`Error::NoResponse`](crate::Error::NoResponse) if nobody matched `target`
    /// - [`Error::EmptyResponse`](crate::Error::EmptyResponse) if the responder sent nothing
    pub fn request_get(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
    ) -> Result<Reply> {
        let handle = self.resolve(handle)?;
        let request = Request::get(target, params, mode);

        trace!(%handle, ?request, "XPA get");
        self.transport().get(handle, &request)?.classify(target)
    }

    /// Issues a set request carrying `buf`.
    ///
    /// `len = None` sends `buf` up to its first NUL byte; binary payloads
    /// with embedded NULs must pass an explicit length.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `len` exceeds `buf`
    /// - [`Error::Connection`](crate::Error::Connection) if the shared handle cannot be opened
    /// - [`Error::NoResponse`](crate::Error::NoResponse) if nobody matched `target`
    pub fn request_set(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
        buf: &[u8],
        len: Option<usize>,
    ) -> Result<Reply> {
        let request = Request::set(target, params, mode, buf, len)?;
        let handle = self.resolve(handle)?;

        trace!(%handle, ?request, "XPA set");
        self.transport()
            .set(handle, &request)?
            .classify(SET_OPERATION, target)
    }

    /// Issues a set request whose payload the transport reads from `fd`.
    ///
    /// The descriptor is only borrowed; it is left open.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`](crate::Error::Connection) if the shared handle cannot be opened
    /// - [`Error::NoResponse`](crate::Error::NoResponse) if nobody matched `target`
    #[cfg(unix)]
    pub fn request_set_fd(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
        fd: impl AsFd,
    ) -> Result<Reply> {
        let handle = self.resolve(handle)?;
        let request = Request::set_fd(target, params, mode);

        trace!(%handle, ?request, "XPA set from descriptor");
        self.transport()
            .set_fd(handle, &request, fd.as_fd())?
            .classify(SET_FD_OPERATION, target)
    }
}

// ============================================================================
// Xpa - Text Requests
// ============================================================================

impl<T: XpaTransport> Xpa<T> {
    /// Retrieves data from `target`.
    ///
    /// A responder's error text is returned as the result, not raised.
    ///
    /// # Errors
    ///
    /// As [`request_get`](Self::request_get), plus
    /// [`Error::Encoding`](crate::Error::Encoding) for a non-UTF-8 payload.
    pub fn get(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
    ) -> Result<String> {
        self.request_get(handle, target, params, mode)?.into_text()
    }

    /// Retrieves raw bytes from `target`.
    ///
    /// A responder's error text is returned as bytes, not raised.
    ///
    /// # Errors
    ///
    /// As [`request_get`](Self::request_get).
    pub fn get_bytes(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
    ) -> Result<Vec<u8>> {
        Ok(self.request_get(handle, target, params, mode)?.into_bytes())
    }

    /// Sends `buf` to `target`.
    ///
    /// Returns `""` on success, or the responder's error text.
    ///
    /// # Errors
    ///
    /// As [`request_set`](Self::request_set).
    pub fn set(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
        buf: &[u8],
        len: Option<usize>,
    ) -> Result<String> {
        Ok(reply_text(
            self.request_set(handle, target, params, mode, buf, len)?,
        ))
    }

    /// Sends the contents of `fd` to `target`.
    ///
    /// Returns `""` on success, or the responder's error text.
    ///
    /// # Errors
    ///
    /// As [`request_set_fd`](Self::request_set_fd).
    #[cfg(unix)]
    pub fn set_fd(
        &self,
        handle: Option<XpaHandle>,
        target: &str,
        params: &str,
        mode: &str,
        fd: impl AsFd,
    ) -> Result<String> {
        Ok(reply_text(
            self.request_set_fd(handle, target, params, mode, fd)?,
        ))
    }
}

/// Set requests answer with an empty payload on success.
fn reply_text(reply: Reply) -> String {
    match reply {
        Reply::Payload(_) => String::new(),
        Reply::ProtocolError(error) => error,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Seek, SeekFrom, Write};
    use std::sync::Arc;

    use crate::Error;
    use crate::protocol::{GetOutcome, SetOutcome};
    use crate::transport::{CallKind, StubTransport};

    fn xpa() -> (Arc<StubTransport>, Xpa<Arc<StubTransport>>) {
        let stub = Arc::new(StubTransport::new());
        (Arc::clone(&stub), Xpa::with_transport(stub))
    }

    #[test]
    fn test_get_returns_payload() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::payload("1"));

        assert_eq!(xpa.get(None, "ds9", "frame 1", "").unwrap(), "1");

        let calls = stub.calls();
        assert_eq!(calls[0].kind, CallKind::Get);
        assert_eq!(calls[0].target, "ds9");
        assert_eq!(calls[0].params, "frame 1");
        assert_eq!(calls[0].mode, "");
    }

    #[test]
    fn test_get_no_match_is_error() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::no_match());

        let err = xpa.get(None, "ds9", "frame", "").unwrap_err();
        assert!(matches!(err, Error::NoResponse { operation: "XPAGet", .. }));
    }

    #[test]
    fn test_get_protocol_error_is_returned() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::error("XPA$ERROR unknown option"));

        assert_eq!(
            xpa.get(None, "ds9", "bogus", "").unwrap(),
            "XPA$ERROR unknown option"
        );
    }

    #[test]
    fn test_get_empty_is_error() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::empty());

        let err = xpa.get(None, "ds9", "frame", "").unwrap_err();
        assert!(matches!(err, Error::EmptyResponse { .. }));
    }

    #[test]
    fn test_get_bytes_is_byte_exact() {
        let (stub, xpa) = xpa();
        let raw = vec![0u8, 159, 146, 150, 10];
        stub.push_get(GetOutcome::payload(raw.clone()));

        assert_eq!(xpa.get_bytes(None, "ds9", "array", "").unwrap(), raw);
    }

    #[test]
    fn test_get_non_utf8_is_encoding_error() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::payload(vec![0xff]));

        let err = xpa.get(None, "ds9", "array", "").unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_requests_share_one_handle() {
        let (stub, xpa) = xpa();
        xpa.get(None, "ds9", "frame", "").unwrap();
        xpa.set(None, "ds9", "frame 2", "", b"", None).unwrap();

        let calls = stub.calls();
        assert_eq!(stub.open_count(), 1);
        assert_eq!(calls[0].handle, calls[1].handle);
    }

    #[test]
    fn test_explicit_handle_bypasses_manager() {
        let (stub, xpa) = xpa();
        let mine = stub.open_explicit().unwrap();

        xpa.get(Some(mine), "ds9", "frame", "").unwrap();

        assert_eq!(xpa.manager().current(), None);
        assert_eq!(stub.calls()[0].handle, mine);

        xpa.reset();
        drop(xpa);
        assert!(stub.is_live(mine));
    }

    #[test]
    fn test_connection_error_propagates() {
        let (stub, xpa) = xpa();
        stub.fail_open(Some("Unable to open XPA"));

        let err = xpa.get(None, "ds9", "frame", "").unwrap_err();
        assert!(err.is_connection_error());
        assert!(stub.calls().is_empty());
    }

    #[test]
    fn test_failed_request_keeps_shared_handle() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::no_match());

        assert!(xpa.get(None, "ds9", "frame", "").is_err());
        let handle = xpa.manager().current().unwrap();
        assert!(stub.is_live(handle));
    }

    #[test]
    fn test_set_auto_length() {
        let (stub, xpa) = xpa();
        assert_eq!(xpa.set(None, "ds9", "regions", "", b"circle 1 2 3", None).unwrap(), "");
        assert_eq!(stub.calls()[0].payload, b"circle 1 2 3");
    }

    #[test]
    fn test_set_explicit_length_with_embedded_nul() {
        let (stub, xpa) = xpa();
        let buf = [1u8, 0, 2, 0, 3];
        xpa.set(None, "ds9", "array", "", &buf, Some(buf.len())).unwrap();
        assert_eq!(stub.calls()[0].payload, buf);
    }

    #[test]
    fn test_set_bad_length_does_not_open() {
        let (stub, xpa) = xpa();
        let err = xpa.set(None, "ds9", "array", "", b"ab", Some(3)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(stub.open_count(), 0);
    }

    #[test]
    fn test_set_outcomes() {
        let (stub, xpa) = xpa();
        stub.push_set(SetOutcome::error("XPA$ERROR invalid frame"));
        stub.push_set(SetOutcome::no_match());

        assert_eq!(
            xpa.set(None, "ds9", "frame", "", b"x", None).unwrap(),
            "XPA$ERROR invalid frame"
        );
        let err = xpa.set(None, "ds9", "frame", "", b"x", None).unwrap_err();
        assert!(matches!(err, Error::NoResponse { operation: "XPASet", .. }));
    }

    #[test]
    fn test_set_fd_reads_descriptor_and_leaves_it_open() {
        let (stub, xpa) = xpa();
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"regions data").unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        assert_eq!(xpa.set_fd(None, "ds9", "regions", "", &file).unwrap(), "");
        assert_eq!(stub.calls()[0].kind, CallKind::SetFd);
        assert_eq!(stub.calls()[0].payload, b"regions data");

        // Caller still owns a working descriptor.
        file.write_all(b"!").unwrap();
    }

    #[test]
    fn test_set_fd_outcomes() {
        let (stub, xpa) = xpa();
        let file = tempfile::tempfile().unwrap();
        stub.push_set(SetOutcome::error("XPA$ERROR bad fits"));
        stub.push_set(SetOutcome::no_match());

        assert_eq!(
            xpa.set_fd(None, "ds9", "fits", "", &file).unwrap(),
            "XPA$ERROR bad fits"
        );
        let err = xpa.set_fd(None, "ds9", "fits", "", &file).unwrap_err();
        assert!(matches!(err, Error::NoResponse { operation: "XPASetFd", .. }));
    }

    #[test]
    fn test_request_get_is_tagged() {
        let (stub, xpa) = xpa();
        stub.push_get(GetOutcome::error("XPA$ERROR nope"));

        let reply = xpa.request_get(None, "ds9", "frame", "").unwrap();
        assert!(reply.is_protocol_error());
        assert!(reply.into_result().unwrap_err().is_protocol_error());
    }

    #[test]
    fn test_reset_then_request_opens_fresh_handle() {
        let (stub, xpa) = xpa();
        xpa.get(None, "ds9", "frame", "").unwrap();
        xpa.reset();
        xpa.get(None, "ds9", "frame", "").unwrap();

        let calls = stub.calls();
        assert_ne!(calls[0].handle, calls[1].handle);
        assert_eq!(stub.closed(), vec![calls[0].handle]);
    }
}
