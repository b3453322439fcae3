//! Builder pattern for connector configuration.
//!
//! Provides a fluent API for configuring a command-line backed [`Xpa`].
//!
//! # Example
//!
//! ```no_run
//! use ds9_xpa::Xpa;
//!
//! # fn example() -> ds9_xpa::Result<()> {
//! let xpa = Xpa::builder()
//!     .xpaget("/opt/xpa/bin/xpaget")
//!     .xpaset("/opt/xpa/bin/xpaset")
//!     .arg("-t")
//!     .arg("5,10")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};
use crate::transport::CliTransport;

use super::core::Xpa;
use super::options::{CliOptions, XPAGET, XPASET, find_on_path};

// ============================================================================
// XpaBuilder
// ============================================================================

/// Builder for configuring an [`Xpa`] connector.
///
/// Use [`Xpa::builder()`] to create a new builder. Tools not set
/// explicitly are looked up on `PATH` when building.
#[derive(Debug, Default, Clone)]
pub struct XpaBuilder {
    /// Path to `xpaget`.
    xpaget: Option<PathBuf>,
    /// Path to `xpaset`.
    xpaset: Option<PathBuf>,
    /// Extra tool arguments.
    extra_args: Vec<String>,
}

// ============================================================================
// XpaBuilder Implementation
// ============================================================================

impl XpaBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to `xpaget`.
    #[inline]
    #[must_use]
    pub fn xpaget(mut self, path: impl Into<PathBuf>) -> Self {
        self.xpaget = Some(path.into());
        self
    }

    /// Sets the path to `xpaset`.
    #[inline]
    #[must_use]
    pub fn xpaset(mut self, path: impl Into<PathBuf>) -> Self {
        self.xpaset = Some(path.into());
        self
    }

    /// Adds an argument passed to every tool invocation.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Replaces all settings with `options`.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: CliOptions) -> Self {
        self.xpaget = Some(options.xpaget);
        self.xpaset = Some(options.xpaset);
        self.extra_args = options.extra_args;
        self
    }

    /// Builds the connector with validation.
    ///
    /// No XPA session is opened until the first request.
    ///
    /// # Errors
    ///
    /// - [`Error::XpaToolNotFound`] if an explicit tool path doesn't exist
    /// - [`Error::Config`] if a tool left unset is not on `PATH`
    pub fn build(self) -> Result<Xpa<CliTransport>> {
        let options = self.into_options()?;
        debug!(
            xpaget = %options.xpaget.display(),
            xpaset = %options.xpaset.display(),
            "XPA connector configured"
        );
        Ok(Xpa::with_transport(CliTransport::new(options)))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl XpaBuilder {
    /// Resolves and validates the tool configuration.
    fn into_options(self) -> Result<CliOptions> {
        let xpaget = resolve_tool(self.xpaget, XPAGET)?;
        let xpaset = resolve_tool(self.xpaset, XPASET)?;

        Ok(CliOptions::new(xpaget, xpaset).with_args(self.extra_args))
    }
}

/// Validates an explicit path, or finds the tool on `PATH`.
fn resolve_tool(explicit: Option<PathBuf>, name: &str) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.exists() => Ok(path),
        Some(path) => Err(Error::xpa_tool_not_found(path)),
        None => find_on_path(name),
    }
}

// ============================================================================
// Tests
// ============================================================================
