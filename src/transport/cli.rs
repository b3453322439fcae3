//! Transport driving the XPA command-line tools.
//!
//! Each request runs `xpaget` or `xpaset` once:
//!
//! | Request | Invocation | Payload |
//! |---------|------------|---------|
//! | get | `xpaget [args] <target> [params]` | stdout |
//! | set (payload) | `xpaset [args] <target> [params]` | written to stdin |
//! | set (empty) | `xpaset [args] -p <target> [params]` | none |
//! | set_fd | `xpaset [args] <target> [params]` | stdin is a dup of the fd |
//!
//! The tools report "no ... access points match template" when nobody
//! answered; that becomes a zero match count. Any other diagnostic
//! (normally prefixed `XPA$ERROR`) is the responder's error text.
//!
//! Sessions are bookkeeping only: each invocation is its own XPA
//! connection, so `open` validates the tools and `close` forgets the handle.

// ============================================================================
// Imports
// ============================================================================

use std::io::{self, Write};
#[cfg(unix)]
use std::os::fd::BorrowedFd;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::thread;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, info, trace};

use crate::client::options::CliOptions;
use crate::error::{Error, Result};
use crate::identifiers::XpaHandle;
use crate::protocol::{GetOutcome, Request, SetOutcome};

use super::XpaTransport;

// ============================================================================
// Constants
// ============================================================================

/// Diagnostic fragment the tools print when no access point matched.
const NO_MATCH_MARKER: &str = "access points match";

/// Prefix of error text reported by XPA responders.
const XPA_ERROR_PREFIX: &str = "XPA$ERROR";

/// `xpaset` flag: do not read a payload from stdin.
const NO_STDIN_FLAG: &str = "-p";

// ============================================================================
// CliTransport
// ============================================================================

/// XPA transport backed by `xpaget` and `xpaset`.
#[derive(Debug)]
pub struct CliTransport {
    /// Tool paths and extra arguments.
    options: CliOptions,

    /// Handles handed out and not yet closed.
    sessions: Mutex<FxHashSet<XpaHandle>>,
}

impl CliTransport {
    /// Creates a transport using the given tools.
    #[must_use]
    pub fn new(options: CliOptions) -> Self {
        Self {
            options,
            sessions: Mutex::new(FxHashSet::default()),
        }
    }

    /// Creates a transport using the tools found on `PATH`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the tools are not on `PATH`.
    pub fn from_path() -> Result<Self> {
        Ok(Self::new(CliOptions::from_path()?))
    }

    /// Returns the tool configuration.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &CliOptions {
        &self.options
    }

    /// Returns the number of open sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    fn ensure_open(&self, handle: XpaHandle) -> Result<()> {
        if self.sessions.lock().contains(&handle) {
            Ok(())
        } else {
            Err(Error::invalid_argument(format!("{handle} is not open")))
        }
    }

    fn command(&self, tool: &Path, request: &Request<'_>, no_stdin: bool) -> Command {
        let mut cmd = Command::new(tool);
        cmd.args(&self.options.extra_args);
        if no_stdin {
            cmd.arg(NO_STDIN_FLAG);
        }
        cmd.arg(request.target);
        if !request.params.is_empty() {
            cmd.arg(request.params);
        }
        if !request.mode.is_empty() {
            debug!(mode = request.mode, "XPA mode not forwarded to command-line tools");
        }
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }
}

impl XpaTransport for CliTransport {
    fn open(&self, mode: &str) -> Result<XpaHandle> {
        self.options
            .validate()
            .map_err(|e| Error::connection(e.to_string()))?;

        let handle = XpaHandle::generate();
        self.sessions.lock().insert(handle);

        info!(%handle, mode, "XPA session opened");
        Ok(handle)
    }

    fn close(&self, handle: XpaHandle) {
        if self.sessions.lock().remove(&handle) {
            info!(%handle, "XPA session closed");
        }
    }

    fn get(&self, handle: XpaHandle, request: &Request<'_>) -> Result<GetOutcome> {
        self.ensure_open(handle)?;

        let output = self
            .command(&self.options.xpaget, request, false)
            .stdin(Stdio::null())
            .output()?;

        trace!(access_point = request.target, params = request.params, status = %output.status, "xpaget finished");

        Ok(match classify_failure(&output) {
            Some(failure) => failure.into_get(),
            None if output.stdout.is_empty() => GetOutcome::empty(),
            None => GetOutcome::payload(output.stdout),
        })
    }

    fn set(&self, handle: XpaHandle, request: &Request<'_>) -> Result<SetOutcome> {
        self.ensure_open(handle)?;

        let payload = request.payload.unwrap_or_default();
        let output = if payload.is_empty() {
            self.command(&self.options.xpaset, request, true)
                .stdin(Stdio::null())
                .output()?
        } else {
            run_with_stdin(self.command(&self.options.xpaset, request, false), payload)?
        };

        trace!(
            access_point = request.target,
            params = request.params,
            len = payload.len(),
            status = %output.status,
            "xpaset finished"
        );

        Ok(classify_failure(&output).map_or_else(SetOutcome::ok, Failure::into_set))
    }

    #[cfg(unix)]
    fn set_fd(
        &self,
        handle: XpaHandle,
        request: &Request<'_>,
        fd: BorrowedFd<'_>,
    ) -> Result<SetOutcome> {
        self.ensure_open(handle)?;

        // The child gets its own duplicate; the caller's descriptor stays open.
        let stdin = Stdio::from(fd.try_clone_to_owned()?);
        let output = self
            .command(&self.options.xpaset, request, false)
            .stdin(stdin)
            .output()?;

        trace!(access_point = request.target, params = request.params, status = %output.status, "xpaset (fd) finished");

        Ok(classify_failure(&output).map_or_else(SetOutcome::ok, Failure::into_set))
    }
}

// ============================================================================
// Process Helpers
// ============================================================================

/// Runs `cmd`, feeding `payload` on stdin while collecting its output.
fn run_with_stdin(mut cmd: Command, payload: &[u8]) -> Result<Output> {
    let mut child = cmd.stdin(Stdio::piped()).spawn()?;
    let stdin = child.stdin.take();

    let (written, output) = thread::scope(|scope| {
        let writer = scope.spawn(move || -> io::Result<()> {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload)?;
            }
            Ok(())
        });
        let output = child.wait_with_output();
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
        (written, output)
    });

    let output = output?;
    // A tool that bailed out early closes stdin; its own diagnostic wins.
    if output.status.success() {
        written?;
    }
    Ok(output)
}

// ============================================================================
// Output Classification
// ============================================================================

/// Why a tool invocation did not succeed.
#[derive(Debug, PartialEq, Eq)]
enum Failure {
    /// No access point matched the template.
    NoMatch,
    /// Error text from the responder (or the tool).
    Error(String),
}

impl Failure {
    fn into_get(self) -> GetOutcome {
        match self {
            Self::NoMatch => GetOutcome::no_match(),
            Self::Error(text) => GetOutcome::error(text),
        }
    }

    fn into_set(self) -> SetOutcome {
        match self {
            Self::NoMatch => SetOutcome::no_match(),
            Self::Error(text) => SetOutcome::error(text),
        }
    }
}

/// Inspects a finished invocation; `None` means success.
fn classify_failure(output: &Output) -> Option<Failure> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if output.status.success() {
        // Some XPA builds exit 0 and only print the error.
        return stderr
            .starts_with(XPA_ERROR_PREFIX)
            .then(|| classify_diagnostic(stderr));
    }

    let diagnostic = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_owned()
    } else {
        stderr.to_owned()
    };

    if diagnostic.is_empty() {
        return Some(Failure::Error(format!("XPA tool exited with {}", output.status)));
    }
    Some(classify_diagnostic(&diagnostic))
}

fn classify_diagnostic(diagnostic: &str) -> Failure {
    if diagnostic.contains(NO_MATCH_MARKER) {
        Failure::NoMatch
    } else {
        Failure::Error(diagnostic.to_owned())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::fs;
    use std::io::{Seek, SeekFrom};
    use std::os::fd::AsFd;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use tempfile::TempDir;

    /// Writes an executable shell script into `dir`.
    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn transport(xpaget: &str, xpaset: &str) -> (TempDir, CliTransport) {
        let dir = tempfile::tempdir().unwrap();
        let get = script(&dir, "xpaget", xpaget);
        let set = script(&dir, "xpaset", xpaset);
        (dir, CliTransport::new(CliOptions::new(get, set)))
    }

    #[test]
    fn test_open_fails_without_tools() {
        let transport = CliTransport::new(CliOptions::new("/nonexistent/xpaget", "/nonexistent/xpaset"));
        let err = transport.open("w").unwrap_err();
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("/nonexistent/xpaget"));
    }

    #[test]
    fn test_open_close_tracks_sessions() {
        let (_dir, transport) = transport("exit 0", "exit 0");
        let handle = transport.open("w").unwrap();
        assert_eq!(transport.session_count(), 1);
        transport.close(handle);
        transport.close(handle);
        assert_eq!(transport.session_count(), 0);
    }

    #[test]
    fn test_get_passes_target_and_params() {
        let (_dir, transport) = transport(r#"printf '%s|' "$@""#, "exit 0");
        let handle = transport.open("w").unwrap();

        let outcome = transport
            .get(handle, &Request::get("ds9", "frame 1", ""))
            .unwrap();
        assert_eq!(outcome, GetOutcome::payload("ds9|frame 1|"));
    }

    #[test]
    fn test_get_extra_args_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let get = script(&dir, "xpaget", r#"printf '%s|' "$@""#);
        let set = script(&dir, "xpaset", "exit 0");
        let transport = CliTransport::new(CliOptions::new(get, set).with_args(["-t", "5,10"]));
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "", "")).unwrap();
        assert_eq!(outcome, GetOutcome::payload("-t|5,10|ds9|"));
    }

    #[test]
    fn test_get_no_match() {
        let (_dir, transport) = transport(
            r#"echo "XPA\$ERROR no 'xpaget' access points match template: $1" >&2; exit 1"#,
            "exit 0",
        );
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "frame", "")).unwrap();
        assert_eq!(outcome, GetOutcome::no_match());
    }

    #[test]
    fn test_get_protocol_error() {
        let (_dir, transport) = transport(
            r#"echo 'XPA$ERROR unknown command: frob' >&2; exit 1"#,
            "exit 0",
        );
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "frob", "")).unwrap();
        assert_eq!(outcome, GetOutcome::error("XPA$ERROR unknown command: frob"));
    }

    #[test]
    fn test_get_empty_stdout_is_empty_response() {
        let (_dir, transport) = transport("exit 0", "exit 0");
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "frame", "")).unwrap();
        assert_eq!(outcome, GetOutcome::empty());
    }

    #[test]
    fn test_get_silent_failure_reports_status() {
        let (_dir, transport) = transport("exit 3", "exit 0");
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "frame", "")).unwrap();
        let error = outcome.error.unwrap();
        assert!(error.starts_with("XPA tool exited with"));
    }

    #[test]
    fn test_get_on_unknown_handle() {
        let (_dir, transport) = transport("exit 0", "exit 0");
        let err = transport
            .get(XpaHandle::generate(), &Request::get("ds9", "frame", ""))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_set_writes_payload_to_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("sink");
        let get = script(&dir, "xpaget", "exit 0");
        let set = script(&dir, "xpaset", &format!(r#"printf '%s|' "$@" > {0}; cat >> {0}"#, sink.display()));
        let transport = CliTransport::new(CliOptions::new(get, set));
        let handle = transport.open("w").unwrap();

        let request = Request::set("ds9", "regions", "", b"circle 10 10 5", None).unwrap();
        let outcome = transport.set(handle, &request).unwrap();

        assert_eq!(outcome, SetOutcome::ok());
        assert_eq!(fs::read_to_string(&sink).unwrap(), "ds9|regions|circle 10 10 5");
    }

    #[test]
    fn test_set_without_payload_uses_no_stdin_flag() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("sink");
        let get = script(&dir, "xpaget", "exit 0");
        let set = script(&dir, "xpaset", &format!(r#"printf '%s|' "$@" > {}"#, sink.display()));
        let transport = CliTransport::new(CliOptions::new(get, set));
        let handle = transport.open("w").unwrap();

        let request = Request::set("ds9", "frame 2", "", b"", None).unwrap();
        transport.set(handle, &request).unwrap();

        assert_eq!(fs::read_to_string(&sink).unwrap(), "-p|ds9|frame 2|");
    }

    #[test]
    fn test_set_protocol_error() {
        let (_dir, transport) = transport(
            "exit 0",
            r#"cat > /dev/null; echo 'XPA$ERROR invalid frame' >&2; exit 1"#,
        );
        let handle = transport.open("w").unwrap();

        let request = Request::set("ds9", "frame", "", b"99", None).unwrap();
        let outcome = transport.set(handle, &request).unwrap();
        assert_eq!(outcome, SetOutcome::error("XPA$ERROR invalid frame"));
    }

    #[test]
    fn test_set_no_match_without_reading_stdin() {
        let (_dir, transport) = transport(
            "exit 0",
            r#"echo "XPA\$ERROR no 'xpaset' access points match template: ds9" >&2; exit 1"#,
        );
        let handle = transport.open("w").unwrap();

        let big = vec![b'x'; 1 << 20];
        let request = Request::set("ds9", "fits", "", &big, None).unwrap();
        let outcome = transport.set(handle, &request).unwrap();
        assert_eq!(outcome, SetOutcome::no_match());
    }

    #[test]
    fn test_set_fd_streams_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let sink = dir.path().join("sink");
        let get = script(&dir, "xpaget", "exit 0");
        let set = script(&dir, "xpaset", &format!("cat > {}", sink.display()));
        let transport = CliTransport::new(CliOptions::new(get, set));
        let handle = transport.open("w").unwrap();

        let mut source = tempfile::tempfile().unwrap();
        source.write_all(b"SIMPLE  =                    T").unwrap();
        source.seek(SeekFrom::Start(0)).unwrap();

        let outcome = transport
            .set_fd(handle, &Request::set_fd("ds9", "fits", ""), source.as_fd())
            .unwrap();

        assert_eq!(outcome, SetOutcome::ok());
        assert_eq!(fs::read_to_string(&sink).unwrap(), "SIMPLE  =                    T");
        // Still usable by the caller.
        source.seek(SeekFrom::Start(0)).unwrap();
    }

    #[test]
    fn test_classify_exit_zero_with_error_text() {
        let (_dir, transport) = transport(r#"echo 'XPA$ERROR busy' >&2; exit 0"#, "exit 0");
        let handle = transport.open("w").unwrap();

        let outcome = transport.get(handle, &Request::get("ds9", "frame", "")).unwrap();
        assert_eq!(outcome, GetOutcome::error("XPA$ERROR busy"));
    }
}
