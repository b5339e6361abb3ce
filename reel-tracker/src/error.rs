//! Error types for reel-tracker
//!
//! The core degrades to "no information" instead of failing wherever the
//! host page could observe a failure (extraction, resolution, scanning).
//! These errors cover configuration, capture loading and misuse of the
//! overlay API.

use thiserror::Error;

use crate::dom::NodeId;

/// Main error type for reel-tracker
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (configuration, I/O)
    #[error(transparent)]
    Common(#[from] reel_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracked element is no longer attached to the document
    #[error("Stale element: {0:?}")]
    StaleElement(NodeId),

    /// Control is not tracked by this session
    #[error("Unknown control: {0:?}")]
    UnknownControl(NodeId),

    /// Requested lifecycle transition is not allowed from the current state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Capture file could not be interpreted
    #[error("Capture error: {0}")]
    Capture(String),
}

/// Convenience Result type using reel-tracker Error
pub type Result<T> = std::result::Result<T, Error>;
