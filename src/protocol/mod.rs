//! XPA request and reply types.
//!
//! This module defines what travels between the request wrappers and a
//! transport. It does not define the XPA wire format; that belongs to the
//! transport.
//!
//! # Request Flow
//!
//! | Step | Type | Produced by |
//! |------|------|-------------|
//! | 1 | [`Request`] | request wrapper |
//! | 2 | [`GetOutcome`] / [`SetOutcome`] | transport |
//! | 3 | [`Reply`] or [`Error`](crate::Error) | outcome classification |

// ============================================================================
// Submodules
// ============================================================================

/// Request, outcome and reply types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::{
    GET_OPERATION, GetOutcome, Reply, Request, SET_FD_OPERATION, SET_OPERATION, SetOutcome,
    natural_len,
};
