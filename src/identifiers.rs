//! Type-safe identifiers for XPA sessions.
//!
//! An [`XpaHandle`] names one open transport session. Handles are plain
//! values: copying one does not duplicate the session, and closing is the
//! business of whoever opened it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// XpaHandle
// ============================================================================

/// Opaque identifier for an open XPA session.
///
/// Every call to [`XpaHandle::generate`] yields a value never seen before,
/// so a closed handle is never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XpaHandle(Uuid);

impl XpaHandle {
    /// Generates a fresh, unique handle.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for XpaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xpa:{}", self.0.simple())
    }
}

// ============================================================================
// Tests
// ============================================================================
