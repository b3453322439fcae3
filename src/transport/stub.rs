//! Scripted in-memory transport.
//!
//! [`StubTransport`] answers requests from queues of canned outcomes and
//! records every session and call, so handle lifecycle and reply handling
//! can be exercised without a running DS9.
//!
//! ```ignore
//! use std::sync::Arc;
//! use ds9_xpa::{GetOutcome, StubTransport, Xpa};
//!
//! let stub = Arc::new(StubTransport::new());
//! stub.push_get(GetOutcome::payload("1"));
//!
//! let xpa = Xpa::with_transport(Arc::clone(&stub));
//! assert_eq!(xpa.get(None, "ds9", "frame", "")?, "1");
//! assert_eq!(stub.open_count(), 1);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
#[cfg(unix)]
use std::fs::File;
#[cfg(unix)]
use std::io::Read;
#[cfg(unix)]
use std::os::fd::BorrowedFd;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::XpaHandle;
use crate::protocol::{GetOutcome, Request, SetOutcome};

use super::XpaTransport;

// ============================================================================
// RecordedCall
// ============================================================================

/// Which primitive a recorded call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// `get`
    Get,
    /// `set`
    Set,
    /// `set_fd`
    SetFd,
}

/// A request as seen by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Primitive used.
    pub kind: CallKind,
    /// Handle the request was issued on.
    pub handle: XpaHandle,
    /// Target template.
    pub target: String,
    /// Parameter list.
    pub params: String,
    /// Mode string.
    pub mode: String,
    /// Payload sent (read from the descriptor for `set_fd`).
    pub payload: Vec<u8>,
}

// ============================================================================
// StubTransport
// ============================================================================

#[derive(Default)]
struct StubState {
    /// Handles currently open.
    live: FxHashSet<XpaHandle>,
    /// Every handle ever opened, in order.
    opened: Vec<XpaHandle>,
    /// Every handle closed, in order.
    closed: Vec<XpaHandle>,
    /// Modes passed to `open`.
    open_modes: Vec<String>,
    get_replies: VecDeque<GetOutcome>,
    set_replies: VecDeque<SetOutcome>,
    open_failure: Option<String>,
    open_delay: Option<Duration>,
    calls: Vec<RecordedCall>,
}

/// Scripted, recording transport.
///
/// Queued outcomes are consumed in order. When a queue is empty, `get`
/// answers with an empty payload and `set`/`set_fd` succeed.
#[derive(Default)]
pub struct StubTransport {
    state: Mutex<StubState>,
}

impl StubTransport {
    /// Creates a stub with empty queues.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the outcome of the next `get`.
    pub fn push_get(&self, outcome: GetOutcome) {
        self.state.lock().get_replies.push_back(outcome);
    }

    /// Queues the outcome of the next `set` or `set_fd`.
    pub fn push_set(&self, outcome: SetOutcome) {
        self.state.lock().set_replies.push_back(outcome);
    }

    /// Makes subsequent `open` calls fail with `message` (`None` to heal).
    pub fn fail_open(&self, message: Option<&str>) {
        self.state.lock().open_failure = message.map(str::to_owned);
    }

    /// Makes `open` sleep before answering, to widen race windows in tests.
    pub fn set_open_delay(&self, delay: Option<Duration>) {
        self.state.lock().open_delay = delay;
    }

    /// Number of sessions opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    /// Number of sessions closed so far.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().closed.len()
    }

    /// Every handle ever opened, in order.
    #[must_use]
    pub fn opened(&self) -> Vec<XpaHandle> {
        self.state.lock().opened.clone()
    }

    /// Every handle closed, in order.
    #[must_use]
    pub fn closed(&self) -> Vec<XpaHandle> {
        self.state.lock().closed.clone()
    }

    /// Modes passed to `open`, in order.
    #[must_use]
    pub fn open_modes(&self) -> Vec<String> {
        self.state.lock().open_modes.clone()
    }

    /// Returns `true` if `handle` is currently open.
    #[must_use]
    pub fn is_live(&self, handle: XpaHandle) -> bool {
        self.state.lock().live.contains(&handle)
    }

    /// Every request issued so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Opens a session without going through a manager, for explicit-handle use.
    ///
    /// # Errors
    ///
    /// Same as [`XpaTransport::open`].
    pub fn open_explicit(&self) -> Result<XpaHandle> {
        self.open("w")
    }

    fn record(
        state: &mut StubState,
        kind: CallKind,
        handle: XpaHandle,
        request: &Request<'_>,
        payload: Vec<u8>,
    ) -> Result<()> {
        if !state.live.contains(&handle) {
            return Err(Error::invalid_argument(format!("{handle} is not open")));
        }

        trace!(?kind, %handle, access_point = request.target, params = request.params, "Stub request");

        state.calls.push(RecordedCall {
            kind,
            handle,
            target: request.target.to_owned(),
            params: request.params.to_owned(),
            mode: request.mode.to_owned(),
            payload,
        });
        Ok(())
    }
}

impl XpaTransport for StubTransport {
    fn open(&self, mode: &str) -> Result<XpaHandle> {
        // Sleep outside the lock so racing openers really overlap.
        let delay = self.state.lock().open_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if let Some(message) = &state.open_failure {
            return Err(Error::connection(message.clone()));
        }

        let handle = XpaHandle::generate();
        state.live.insert(handle);
        state.opened.push(handle);
        state.open_modes.push(mode.to_owned());
        Ok(handle)
    }

    fn close(&self, handle: XpaHandle) {
        let mut state = self.state.lock();
        if state.live.remove(&handle) {
            state.closed.push(handle);
        }
    }

    fn get(&self, handle: XpaHandle, request: &Request<'_>) -> Result<GetOutcome> {
        let mut state = self.state.lock();
        Self::record(&mut state, CallKind::Get, handle, request, Vec::new())?;
        Ok(state
            .get_replies
            .pop_front()
            .unwrap_or_else(|| GetOutcome::payload(Vec::new())))
    }

    fn set(&self, handle: XpaHandle, request: &Request<'_>) -> Result<SetOutcome> {
        let payload = request.payload.unwrap_or_default().to_vec();
        let mut state = self.state.lock();
        Self::record(&mut state, CallKind::Set, handle, request, payload)?;
        Ok(state.set_replies.pop_front().unwrap_or_else(SetOutcome::ok))
    }

    #[cfg(unix)]
    fn set_fd(
        &self,
        handle: XpaHandle,
        request: &Request<'_>,
        fd: BorrowedFd<'_>,
    ) -> Result<SetOutcome> {
        // Read through a duplicate so the caller's descriptor stays open.
        let mut file = File::from(fd.try_clone_to_owned()?);
        let mut payload = Vec::new();
        file.read_to_end(&mut payload)?;

        let mut state = self.state.lock();
        Self::record(&mut state, CallKind::SetFd, handle, request, payload)?;
        Ok(state.set_replies.pop_front().unwrap_or_else(SetOutcome::ok))
    }
}

// ============================================================================
// Tests
// ============================================================================
