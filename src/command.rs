//! Batched DS9 commands.
//!
//! XPA silently truncates parameter lists longer than its internal line
//! buffer, and one round trip per command is slow. [`CommandBuffer`]
//! joins commands with `;` and hands out batches that stay under the
//! limit; [`Commander`] sends those batches as `set` requests.
//!
//! # Buffer Sizes
//!
//! The buffer keeps a stack of sizes. A batch is sent once the pending text
//! reaches the current size, so the initial size of 0 sends every command
//! immediately.
//!
//! ```ignore
//! let mut ds9 = Commander::new(&xpa);
//! ds9.push_size(-1)?;            // buffer as much as XPA allows
//! for (x, y) in points {
//!     ds9.cmd(&format!("regions command {{point {x} {y}}}"))?;
//! }
//! ds9.pop_size()?;               // flushes
//! ```

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, warn};

use crate::client::{Xpa, access_point};
use crate::error::{Error, Result};
use crate::transport::XpaTransport;

// ============================================================================
// Constants
// ============================================================================

/// Size of XPA's internal line buffer, less the slop it needs.
pub const XPA_SZ_LINE: usize = 4096 - 100;

/// Largest usable batch, leaving room for separators and the newline.
pub const MAX_BATCH: usize = XPA_SZ_LINE - 5;

/// Separator between batched commands.
const SEPARATOR: char = ';';

// ============================================================================
// CommandBuffer
// ============================================================================

/// Pending DS9 commands and the stack of buffer sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer {
    /// `;cmd1;cmd2...`
    pending: String,
    /// Buffer size stack; never empty.
    sizes: Vec<usize>,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    /// Creates a buffer that sends every command immediately.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: String::new(),
            sizes: vec![0],
        }
    }

    /// Current buffer size.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.sizes.last().copied().unwrap_or(0)
    }

    /// Depth of the size stack.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.sizes.len()
    }

    /// Pending text, separators included.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Queues `cmd`.
    ///
    /// Returns the batch that has to be sent first when `cmd` would push
    /// the pending text past [`MAX_BATCH`].
    pub fn push(&mut self, cmd: &str) -> Option<String> {
        let overflow = if self.pending.len() + cmd.len() > MAX_BATCH {
            self.take()
        } else {
            None
        };

        self.pending.push(SEPARATOR);
        self.pending.push_str(cmd);
        overflow
    }

    /// Returns `true` once the pending text has reached the buffer size.
    #[inline]
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.pending.len() >= self.size()
    }

    /// Takes the pending text, trailing whitespace removed.
    ///
    /// Returns `None` if nothing worth sending is pending.
    pub fn take(&mut self) -> Option<String> {
        let pending = std::mem::take(&mut self.pending);
        let batch = pending.trim_end();
        (!batch.is_empty()).then(|| batch.to_owned())
    }

    /// Replaces the current buffer size.
    ///
    /// A negative size selects [`MAX_BATCH`]; sizes above [`XPA_SZ_LINE`]
    /// are clamped to it as well.
    pub fn set_size(&mut self, size: isize) {
        let size = clamp_size(size);
        match self.sizes.last_mut() {
            Some(current) => *current = size,
            None => self.sizes.push(size),
        }
    }

    /// Pushes a new buffer size.
    pub fn push_size(&mut self, size: isize) {
        self.sizes.push(0);
        self.set_size(size);
    }

    /// Returns to the previous buffer size. The last level is never popped.
    pub fn pop_size(&mut self) {
        if self.sizes.len() > 1 {
            self.sizes.pop();
        }
    }
}

fn clamp_size(size: isize) -> usize {
    match usize::try_from(size) {
        Err(_) => MAX_BATCH,
        Ok(size) if size > XPA_SZ_LINE => {
            warn!(
                requested = size,
                limit = XPA_SZ_LINE,
                "XPA hardcodes a limit for buffer sizes; using the largest allowed"
            );
            MAX_BATCH
        }
        Ok(size) => size,
    }
}

// ============================================================================
// Commander
// ============================================================================

/// Sends buffered commands to one DS9 target.
///
/// Remote errors are raised here as [`Error::Protocol`], naming the batch
/// that failed.
#[derive(Debug)]
pub struct Commander<'x, T: XpaTransport> {
    xpa: &'x Xpa<T>,
    target: String,
    buffer: CommandBuffer,
}

impl<'x, T: XpaTransport> Commander<'x, T> {
    /// Creates a commander addressing [`access_point()`].
    #[must_use]
    pub fn new(xpa: &'x Xpa<T>) -> Self {
        Self::with_target(xpa, access_point())
    }

    /// Creates a commander addressing `target`.
    #[must_use]
    pub fn with_target(xpa: &'x Xpa<T>, target: impl Into<String>) -> Self {
        Self {
            xpa,
            target: target.into(),
            buffer: CommandBuffer::new(),
        }
    }

    /// Target template commands are sent to.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The command buffer.
    #[inline]
    #[must_use]
    pub fn buffer(&self) -> &CommandBuffer {
        &self.buffer
    }

    /// Queues `cmd`, sending whatever is due.
    ///
    /// # Errors
    ///
    /// Connection and transport errors, or [`Error::Protocol`] if DS9
    /// rejected a batch.
    pub fn cmd(&mut self, cmd: &str) -> Result<()> {
        if let Some(batch) = self.buffer.push(cmd) {
            self.send(&batch)?;
        }
        if self.buffer.is_due() {
            self.flush()?;
        }
        Ok(())
    }

    /// Sends all pending commands.
    ///
    /// # Errors
    ///
    /// As [`cmd`](Self::cmd).
    pub fn flush(&mut self) -> Result<()> {
        match self.buffer.take() {
            Some(batch) => self.send(&batch),
            None => Ok(()),
        }
    }

    /// Asks DS9 for something, bypassing the buffer. The answer is trimmed.
    ///
    /// # Errors
    ///
    /// Connection and transport errors from [`Xpa::get`].
    pub fn query(&self, cmd: &str) -> Result<String> {
        let reply = self.xpa.get(None, &self.target, cmd, "")?;
        Ok(reply.trim().to_owned())
    }

    /// Replaces the current buffer size and flushes.
    ///
    /// # Errors
    ///
    /// As [`flush`](Self::flush).
    pub fn set_size(&mut self, size: isize) -> Result<()> {
        self.buffer.set_size(size);
        self.flush()
    }

    /// Flushes, then pushes a new buffer size.
    ///
    /// # Errors
    ///
    /// As [`flush`](Self::flush).
    pub fn push_size(&mut self, size: isize) -> Result<()> {
        self.flush()?;
        self.buffer.push_size(size);
        Ok(())
    }

    /// Flushes, then returns to the previous buffer size.
    ///
    /// # Errors
    ///
    /// As [`flush`](Self::flush).
    pub fn pop_size(&mut self) -> Result<()> {
        self.flush()?;
        self.buffer.pop_size();
        Ok(())
    }

    fn send(&self, batch: &str) -> Result<()> {
        debug!(access_point = %self.target, len = batch.len(), "Sending DS9 commands");

        let reply = self.xpa.set(None, &self.target, batch, "", b"", None)?;
        if reply.is_empty() {
            Ok(())
        } else {
            Err(Error::protocol(format!("{} ({batch})", reply.trim_end())))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
