//! # Reel Common Library
//!
//! Shared code for the reel tracker crates:
//! - Error types
//! - Tracker configuration loading (TOML) and validation
//! - Event types (TrackerEvent enum) and the EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use config::{LoggingConfig, TrackerConfig};
pub use error::{Error, Result};
pub use events::{EventBus, TrackerEvent};
