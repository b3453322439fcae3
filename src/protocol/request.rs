//! Request, outcome and reply types.
//!
//! A [`Request`] is built per call and handed to the transport. The
//! transport answers with a raw [`GetOutcome`] or [`SetOutcome`] (match
//! count, payload, error text), which is then classified into a [`Reply`]
//! or a hard [`Error`].
//!
//! # Classification
//!
//! | matches | error | payload | result |
//! |---------|-------|---------|--------|
//! | 0 | any | any | [`Error::NoResponse`] |
//! | >0 | `Some` | any | [`Reply::ProtocolError`] |
//! | >0 | `None` | `None` (get) | [`Error::EmptyResponse`] |
//! | >0 | `None` | `Some` / set | [`Reply::Payload`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Operation name reported for get requests.
pub const GET_OPERATION: &str = "XPAGet";

/// Operation name reported for set requests.
pub const SET_OPERATION: &str = "XPASet";

/// Operation name reported for descriptor-backed set requests.
pub const SET_FD_OPERATION: &str = "XPASetFd";

// ============================================================================
// Request
// ============================================================================

/// One request addressed to an XPA access point.
///
/// The payload is already trimmed to its effective length, so transports
/// send `payload` as-is.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// Target template naming the access point(s), e.g. `"ds9"`.
    pub target: &'a str,

    /// Parameter list, e.g. `"frame 1"`. May be empty.
    pub params: &'a str,

    /// Transport-specific mode string. Opaque to this crate.
    pub mode: &'a str,

    /// Payload for set requests.
    pub payload: Option<&'a [u8]>,
}

impl<'a> Request<'a> {
    /// Creates a get request.
    #[inline]
    #[must_use]
    pub const fn get(target: &'a str, params: &'a str, mode: &'a str) -> Self {
        Self {
            target,
            params,
            mode,
            payload: None,
        }
    }

    /// Creates a set request carrying `buf`.
    ///
    /// With `len = None` the payload runs up to the first NUL byte (or the
    /// whole buffer if it has none). An explicit `len` is honoured as-is,
    /// embedded NULs included.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `len` exceeds the buffer.
    pub fn set(
        target: &'a str,
        params: &'a str,
        mode: &'a str,
        buf: &'a [u8],
        len: Option<usize>,
    ) -> Result<Self> {
        let len = match len {
            Some(len) if len > buf.len() => {
                return Err(Error::invalid_argument(format!(
                    "payload length {len} exceeds buffer of {} bytes",
                    buf.len()
                )));
            }
            Some(len) => len,
            None => natural_len(buf),
        };

        Ok(Self {
            target,
            params,
            mode,
            payload: Some(&buf[..len]),
        })
    }

    /// Creates a set request whose payload comes from elsewhere (a descriptor).
    #[inline]
    #[must_use]
    pub const fn set_fd(target: &'a str, params: &'a str, mode: &'a str) -> Self {
        Self::get(target, params, mode)
    }

    /// Returns the payload length in bytes (0 when there is none).
    #[inline]
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.map_or(0, <[u8]>::len)
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("target", &self.target)
            .field("params", &self.params)
            .field("mode", &self.mode)
            .field("payload_len", &self.payload_len())
            .finish()
    }
}

/// Length of `buf` up to (not including) the first NUL byte.
#[inline]
#[must_use]
pub fn natural_len(buf: &[u8]) -> usize {
    buf.iter().position(|&b| b == 0).unwrap_or(buf.len())
}

// ============================================================================
// Outcomes
// ============================================================================

/// Raw answer of a transport get request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetOutcome {
    /// Number of access points that answered.
    pub matches: usize,

    /// Reply payload, if any.
    pub payload: Option<Vec<u8>>,

    /// Error text reported by the responder, if any.
    pub error: Option<String>,
}

impl GetOutcome {
    /// Single responder answering with `payload`.
    #[inline]
    #[must_use]
    pub fn payload(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            matches: 1,
            payload: Some(payload.into()),
            error: None,
        }
    }

    /// Single responder answering with error text.
    #[inline]
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            matches: 1,
            payload: None,
            error: Some(error.into()),
        }
    }

    /// Nobody matched the target template.
    #[inline]
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    /// Single responder answering with nothing at all.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            matches: 1,
            payload: None,
            error: None,
        }
    }

    /// Classifies the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::NoResponse`] if no access point matched
    /// - [`Error::EmptyResponse`] if the responder sent neither payload nor error
    pub fn classify(self, target: &str) -> Result<Reply> {
        if self.matches == 0 {
            return Err(Error::no_response(GET_OPERATION, target));
        }
        if let Some(error) = self.error {
            return Ok(Reply::ProtocolError(error));
        }
        match self.payload {
            Some(payload) => Ok(Reply::Payload(payload)),
            None => Err(Error::empty_response(GET_OPERATION, target)),
        }
    }
}

/// Raw answer of a transport set request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOutcome {
    /// Number of access points that answered.
    pub matches: usize,

    /// Error text reported by the responder, if any.
    pub error: Option<String>,
}

impl SetOutcome {
    /// Single responder accepting the request.
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            matches: 1,
            error: None,
        }
    }

    /// Single responder answering with error text.
    #[inline]
    #[must_use]
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            matches: 1,
            error: Some(error.into()),
        }
    }

    /// Nobody matched the target template.
    #[inline]
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    /// Classifies the outcome; success carries an empty payload.
    ///
    /// # Errors
    ///
    /// [`Error::NoResponse`] if no access point matched.
    pub fn classify(self, operation: &'static str, target: &str) -> Result<Reply> {
        if self.matches == 0 {
            return Err(Error::no_response(operation, target));
        }
        Ok(match self.error {
            Some(error) => Reply::ProtocolError(error),
            None => Reply::Payload(Vec::new()),
        })
    }
}

// ============================================================================
// Reply
// ============================================================================

/// Classified answer from one access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Successful answer. Empty for set requests.
    Payload(Vec<u8>),

    /// Error text reported by the responder.
    ProtocolError(String),
}

impl Reply {
    /// Returns `true` if the responder reported an error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::ProtocolError(_))
    }

    /// Converts into the plain-text contract: payload text, or the error
    /// text itself when the responder reported one.
    ///
    /// # Errors
    ///
    /// [`Error::Encoding`] if the payload is not valid UTF-8.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Payload(payload) => Ok(String::from_utf8(payload)?),
            Self::ProtocolError(error) => Ok(error),
        }
    }

    /// Converts into raw bytes, error text included as bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Payload(payload) => payload,
            Self::ProtocolError(error) => error.into_bytes(),
        }
    }

    /// Strict contract: the payload, or [`Error::Protocol`].
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the responder reported an error.
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self {
            Self::Payload(payload) => Ok(payload),
            Self::ProtocolError(error) => Err(Error::protocol(error)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
