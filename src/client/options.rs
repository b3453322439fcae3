//! XPA tool options and access point resolution.
//!
//! Provides the configuration for [`CliTransport`](crate::CliTransport)
//! and the default target template used to reach DS9.
//!
//! # Example
//!
//! ```ignore
//! use ds9_xpa::client::options::{CliOptions, access_point};
//!
//! let options = CliOptions::from_path()?.with_arg("-t").with_arg("5,10");
//! let target = access_point(); // "ds9" or "127.0.0.1:<port>"
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Name of the XPA get tool.
pub const XPAGET: &str = "xpaget";

/// Name of the XPA set tool.
pub const XPASET: &str = "xpaset";

/// Target template used when `XPA_PORT` does not point anywhere specific.
pub const DEFAULT_ACCESS_POINT: &str = "ds9";

/// Environment variable DS9 users set to bypass the XPA name server.
pub const XPA_PORT_ENV: &str = "XPA_PORT";

/// `DS9:ds9 <port1> <port2>` as written into `XPA_PORT`.
static XPA_PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^DS9:ds9\s+(\d+)\s+(\d+)").expect("XPA_PORT pattern is valid")
});

// ============================================================================
// CliOptions
// ============================================================================

/// Configuration for the XPA command-line tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliOptions {
    /// Path to `xpaget`.
    pub xpaget: PathBuf,

    /// Path to `xpaset`.
    pub xpaset: PathBuf,

    /// Extra arguments placed before the target on every invocation
    /// (e.g. `-t 5,10` for XPA timeouts).
    #[serde(default)]
    pub extra_args: Vec<String>,
}

// ============================================================================
// Constructors
// ============================================================================

impl CliOptions {
    /// Creates options with explicit tool paths.
    #[inline]
    #[must_use]
    pub fn new(xpaget: impl Into<PathBuf>, xpaset: impl Into<PathBuf>) -> Self {
        Self {
            xpaget: xpaget.into(),
            xpaset: xpaset.into(),
            extra_args: Vec::new(),
        }
    }

    /// Resolves both tools on `PATH`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if either tool is not on `PATH`.
    pub fn from_path() -> Result<Self> {
        let path = env::var_os("PATH").unwrap_or_default();
        Self::from_search_path(&path)
    }

    /// Resolves both tools in the given `PATH`-style directory list.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if either tool is missing.
    pub fn from_search_path(search_path: &OsStr) -> Result<Self> {
        let xpaget = find_tool(XPAGET, search_path)?;
        let xpaset = find_tool(XPASET, search_path)?;
        debug!(xpaget = %xpaget.display(), xpaset = %xpaset.display(), "Resolved XPA tools");
        Ok(Self::new(xpaget, xpaset))
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl CliOptions {
    /// Adds an extra argument passed to every tool invocation.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Adds several extra arguments.
    #[inline]
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Checks that both tools exist.
    ///
    /// # Errors
    ///
    /// [`Error::XpaToolNotFound`] naming the first missing tool.
    pub fn validate(&self) -> Result<()> {
        for tool in [&self.xpaget, &self.xpaset] {
            if !tool.exists() {
                return Err(Error::xpa_tool_not_found(tool));
            }
        }
        Ok(())
    }
}

/// Finds `name` on `PATH`.
pub(crate) fn find_on_path(name: &str) -> Result<PathBuf> {
    let path = env::var_os("PATH").unwrap_or_default();
    find_tool(name, &path)
}

/// Finds `name` in a `PATH`-style directory list.
fn find_tool(name: &str, search_path: &OsStr) -> Result<PathBuf> {
    env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_file(candidate))
        .ok_or_else(|| {
            Error::config(format!(
                "You need the xpa binaries in your path: {name} not found.\n\
                 Install XPA or configure the tool paths explicitly."
            ))
        })
}

#[inline]
fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}

// ============================================================================
// Access Point
// ============================================================================

/// Returns the target template for DS9.
///
/// When `XPA_PORT` holds `DS9:ds9 <port1> <port2>`, DS9 is addressed
/// directly at `127.0.0.1:<port1>`; otherwise the name server is asked for
/// `"ds9"`.
#[must_use]
pub fn access_point() -> String {
    match env::var(XPA_PORT_ENV) {
        Ok(value) if !value.is_empty() => parse_access_point(&value).unwrap_or_else(|| {
            warn!(value = %value, "Failed to parse XPA_PORT");
            DEFAULT_ACCESS_POINT.to_owned()
        }),
        _ => DEFAULT_ACCESS_POINT.to_owned(),
    }
}

/// Parses an `XPA_PORT` value into a direct `host:port` target.
#[must_use]
pub fn parse_access_point(xpa_port: &str) -> Option<String> {
    XPA_PORT_PATTERN
        .captures(xpa_port)
        .map(|caps| format!("127.0.0.1:{}", &caps[1]))
}

// ============================================================================
// Tests
// ============================================================================
