//! Lazily opened, resettable shared XPA handle.
//!
//! [`ConnectionManager`] holds at most one implicitly managed handle. The
//! first [`acquire`](ConnectionManager::acquire) opens it in write-capable
//! mode, later calls hand back the same handle, and
//! [`reset`](ConnectionManager::reset) closes it so the next acquire opens a
//! fresh one.
//!
//! # Locking
//!
//! The stored handle sits behind a mutex and `open` runs while the lock is
//! held:
//!
//! - two racing first-time acquires open exactly one session;
//! - a reset cannot close a handle while an acquire is handing it out.
//!
//! A request already running on a handle that a later reset closes fails in
//! the transport, as it would with any closed session.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::identifiers::XpaHandle;
use crate::transport::XpaTransport;

// ============================================================================
// Constants
// ============================================================================

/// Mode used to open the shared handle.
pub const OPEN_MODE: &str = "w";

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owner of the shared XPA handle for one transport.
pub struct ConnectionManager<T: XpaTransport> {
    /// Transport the handle belongs to.
    transport: T,

    /// The implicitly managed handle, if open.
    handle: Mutex<Option<XpaHandle>>,
}

impl<T: XpaTransport> fmt::Debug for ConnectionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("handle", &*self.handle.lock())
            .finish_non_exhaustive()
    }
}

impl<T: XpaTransport> ConnectionManager<T> {
    /// Creates a manager with no open handle.
    #[inline]
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            handle: Mutex::new(None),
        }
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the shared handle, opening it on first use.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`](crate::Error::Connection) if the transport cannot
    /// open a session. Nothing is stored, so the next call tries again.
    pub fn acquire(&self) -> Result<XpaHandle> {
        let mut slot = self.handle.lock();
        if let Some(handle) = *slot {
            return Ok(handle);
        }

        let handle = self.transport.open(OPEN_MODE)?;
        *slot = Some(handle);

        info!(%handle, "Shared XPA handle opened");
        Ok(handle)
    }

    /// Returns the shared handle without opening one.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<XpaHandle> {
        *self.handle.lock()
    }

    /// Closes and forgets the shared handle. No-op when none is open.
    pub fn reset(&self) {
        let taken = self.handle.lock().take();

        match taken {
            Some(handle) => {
                self.transport.close(handle);
                info!(%handle, "Shared XPA handle reset");
            }
            None => debug!("Reset with no shared XPA handle"),
        }
    }
}

impl<T: XpaTransport> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            self.transport.close(handle);
            debug!(%handle, "Shared XPA handle closed on teardown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
