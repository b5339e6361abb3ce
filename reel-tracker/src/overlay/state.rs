//! Per-element overlay lifecycle
//!
//! ```text
//! UNSEEN ──attach──▶ ATTACHED ──activate──▶ WORKING ──settle──▶ SUCCEEDED
//!                       ▲                      │                  │
//!                       │                      └──────settle──▶ FAILED
//!                       └──────── cool-down expired ─────────────┘
//! ```
//!
//! Discarding an entry (host left the document) is not a transition; the
//! entry is simply dropped.

use std::time::Duration;

use tokio::time::Instant;

use crate::dom::NodeId;
use crate::error::{Error, Result};

pub use reel_common::events::OverlayState;

/// Whether `from → to` is a legal lifecycle step
pub fn can_transition(from: OverlayState, to: OverlayState) -> bool {
    use OverlayState::*;
    matches!(
        (from, to),
        (Unseen, Attached)
            | (Attached, Working)
            | (Working, Succeeded)
            | (Working, Failed)
            | (Succeeded, Attached)
            | (Failed, Attached)
    )
}

/// Overlay bookkeeping for one host element
#[derive(Debug, Clone)]
pub struct TrackedControl {
    pub host: NodeId,
    pub control: NodeId,
    pub state: OverlayState,
    pub last_activation: Option<Instant>,
    pub settled_at: Option<Instant>,
}

impl TrackedControl {
    /// Entry for a freshly inserted control
    pub fn attached(host: NodeId, control: NodeId) -> Self {
        Self {
            host,
            control,
            state: OverlayState::Attached,
            last_activation: None,
            settled_at: None,
        }
    }

    /// Move to `to`; returns the previous state
    pub fn transition(&mut self, to: OverlayState) -> Result<OverlayState> {
        if !can_transition(self.state, to) {
            return Err(Error::InvalidTransition(format!(
                "{} -> {} for host {}",
                self.state,
                to,
                self.host.raw()
            )));
        }
        let old = self.state;
        self.state = to;
        Ok(old)
    }

    /// Succeeded/Failed entry whose cool-down has run out
    pub fn cooldown_expired(&self, now: Instant, reset_delay: Duration) -> bool {
        matches!(self.state, OverlayState::Succeeded | OverlayState::Failed)
            && self
                .settled_at
                .is_some_and(|settled| now.saturating_duration_since(settled) >= reset_delay)
    }
}
