//! # Reel Tracker Library (reel-tracker)
//!
//! Media resolution core for a social-media page tracker.
//!
//! **Purpose:** Build an in-memory index of media records from JSON payloads
//! observed on the wire, answer "which record is the user looking at right
//! now?", and drive the per-element overlay control lifecycle.
//!
//! **Architecture:** Interception → Record Extractor → Canonical Record Store
//! and Secondary Index. The Resolver reads the index on demand; the Overlay
//! Lifecycle Manager scans the page periodically and calls the Resolver on
//! activation. All state hangs off one explicit `PageSession` per page.

pub mod capture;
pub mod dom;
pub mod error;
pub mod intercept;
pub mod media;
pub mod overlay;
pub mod resolver;
pub mod session;

pub use dom::{NodeId, PageDom, Rect, Viewport};
pub use error::{Error, Result};
pub use intercept::{Interceptor, NetworkExchange, ResponseKind};
pub use media::{
    Engagement, ExtractionReport, MediaCandidate, MediaIndex, MediaRecord, RecordExtractor,
    UpsertOutcome,
};
pub use overlay::{
    Activation, IgnoreReason, OverlayManager, OverlayState, ScanLoop, ScanReport, SettleOutcome,
};
pub use resolver::{ResolutionStrategy, ResolveContext, Resolution, Resolver};
pub use session::{spawn_scan_loop, ActivationOutcome, PageSession};
