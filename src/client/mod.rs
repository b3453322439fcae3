//! XPA connector module.
//!
//! This module provides the main entry point for talking to DS9.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Xpa`] | Connector exposing `get`, `set`, `set_fd`, `reset` |
//! | [`ConnectionManager`] | Lazily opened, resettable shared handle |
//! | [`XpaBuilder`] | Fluent configuration builder |
//! | [`CliOptions`] | XPA command-line tool configuration |
//!
//! # Example
//!
//! ```no_run
//! use ds9_xpa::{Xpa, access_point};
//!
//! # fn example() -> ds9_xpa::Result<()> {
//! let xpa = Xpa::builder().build()?;
//! let target = access_point();
//!
//! let version = xpa.get(None, &target, "version", "")?;
//! xpa.set(None, &target, "zoom to fit", "", b"", None)?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for connector configuration.
pub mod builder;

/// Connector and request wrappers.
pub mod core;

/// Shared handle lifecycle.
pub mod manager;

/// Tool options and access point resolution.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::XpaBuilder;
pub use self::core::Xpa;
pub use manager::{ConnectionManager, OPEN_MODE};
pub use options::{CliOptions, DEFAULT_ACCESS_POINT, access_point, parse_access_point};
