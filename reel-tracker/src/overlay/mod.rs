//! Overlay control lifecycle
//!
//! - `state`: per-element lifecycle and legal transitions
//! - `manager`: attach/activate/settle/discard against the page document
//! - `throttle`: cool-down gates
//! - `scan_loop`: the periodic scan task

pub mod manager;
pub mod scan_loop;
pub mod state;
pub mod throttle;

pub use manager::{Activation, IgnoreReason, OverlayManager, ScanReport, SettleOutcome};
pub use scan_loop::ScanLoop;
pub use state::{OverlayState, TrackedControl};
pub use throttle::Throttle;
