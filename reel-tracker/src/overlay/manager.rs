//! Overlay Lifecycle Manager
//!
//! Decides which page elements get a control, tracks each control through
//! its lifecycle and keeps the bookkeeping in step with a document that may
//! re-render or drop elements at any moment. Every DOM write is preceded by
//! an existence check; entries whose host has left the document are
//! discarded rather than transitioned.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use reel_common::{time, EventBus, TrackerConfig, TrackerEvent};

use super::state::{OverlayState, TrackedControl};
use super::throttle::{elapsed_at_least, Throttle};
use crate::dom::{NodeId, PageDom};
use crate::error::{Error, Result};

/// Result of a finished operation on a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Succeeded,
    Failed,
}

impl SettleOutcome {
    fn state(self) -> OverlayState {
        match self {
            SettleOutcome::Succeeded => OverlayState::Succeeded,
            SettleOutcome::Failed => OverlayState::Failed,
        }
    }
}

/// Why an activation was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Control is working or cooling down
    Busy,
    /// Within the minimum gap since the previous activation
    TooSoon,
    /// Control is not tracked by this manager
    UnknownControl,
    /// Control or host is no longer in the document
    Stale,
}

/// Outcome of an activation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Control moved to WORKING; `host` is the element it belongs to
    Accepted { host: NodeId },
    Ignored(IgnoreReason),
}

/// What one scan or enhancement pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub attached: usize,
    pub discarded: usize,
    pub reset: usize,
    /// Controls put back after the host re-rendered them away
    pub reinserted: usize,
    /// Entries tracked after the pass
    pub tracked: usize,
}

pub struct OverlayManager {
    session_id: Uuid,
    events: EventBus,
    reset_delay: Duration,
    min_activation_gap: Duration,
    /// Keyed by host element
    entries: HashMap<NodeId, TrackedControl>,
    /// Control element → host element
    controls: HashMap<NodeId, NodeId>,
    enhancement: Throttle,
}

impl OverlayManager {
    pub fn new(config: &TrackerConfig, session_id: Uuid, events: EventBus) -> Self {
        Self {
            session_id,
            events,
            reset_delay: config.reset_delay(),
            min_activation_gap: config.min_activation_gap(),
            entries: HashMap::new(),
            controls: HashMap::new(),
            enhancement: Throttle::new(config.enhancement_cooldown()),
        }
    }

    /// Lifecycle state of a host; untracked hosts are `Unseen`
    pub fn state_of(&self, host: NodeId) -> OverlayState {
        self.entries
            .get(&host)
            .map_or(OverlayState::Unseen, |entry| entry.state)
    }

    /// Control currently tracked for a host
    pub fn control_of(&self, host: NodeId) -> Option<NodeId> {
        self.entries.get(&host).map(|entry| entry.control)
    }

    /// Host a control belongs to
    pub fn host_of(&self, control: NodeId) -> Option<NodeId> {
        self.controls.get(&control).copied()
    }

    /// Number of tracked entries
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Periodic pass: prune, expire cool-downs, attach new controls
    pub fn scan(&mut self, dom: &mut dyn PageDom, now: Instant) -> ScanReport {
        let mut report = ScanReport {
            discarded: self.prune(dom),
            reset: self.reset_expired(dom, now),
            ..ScanReport::default()
        };

        for host in dom.candidate_hosts() {
            if self.entries.contains_key(&host) {
                continue;
            }
            if !dom.is_connected(host) || !dom.contains_playable(host) || dom.has_control(host) {
                continue;
            }
            let Some(control) = dom.insert_control(host) else {
                trace!(host = host.raw(), "Control insertion refused");
                continue;
            };
            dom.set_control_appearance(control, OverlayState::Attached);
            self.entries.insert(host, TrackedControl::attached(host, control));
            self.controls.insert(control, host);
            self.emit(TrackerEvent::ControlAttached {
                session_id: self.session_id,
                host_node: host.raw(),
                control_node: control.raw(),
                timestamp: time::now(),
            });
            report.attached += 1;
        }

        report.tracked = self.entries.len();
        if report.attached + report.discarded + report.reset > 0 {
            debug!(
                attached = report.attached,
                discarded = report.discarded,
                reset = report.reset,
                tracked = report.tracked,
                "Overlay scan"
            );
        }
        report
    }

    /// Throttled full-page pass; `None` when skipped by the cool-down
    ///
    /// Puts back controls that a host re-render removed, then scans.
    pub fn enhance(&mut self, dom: &mut dyn PageDom, now: Instant) -> Option<ScanReport> {
        if !self.enhancement.try_begin(now) {
            trace!("Enhancement pass throttled");
            return None;
        }

        let mut reinserted = 0;
        let idle_hosts: Vec<NodeId> = self
            .entries
            .values()
            .filter(|entry| entry.state == OverlayState::Attached)
            .map(|entry| entry.host)
            .collect();
        for host in idle_hosts {
            if !dom.is_connected(host) || dom.has_control(host) {
                continue;
            }
            let Some(control) = dom.insert_control(host) else {
                continue;
            };
            dom.set_control_appearance(control, OverlayState::Attached);
            if let Some(entry) = self.entries.get_mut(&host) {
                self.controls.remove(&entry.control);
                entry.control = control;
                self.controls.insert(control, host);
                reinserted += 1;
            }
        }

        let mut report = self.scan(dom, now);
        report.reinserted = reinserted;
        self.enhancement.finish();

        debug!(
            reinserted = report.reinserted,
            attached = report.attached,
            tracked = report.tracked,
            "Enhancement pass complete"
        );
        Some(report)
    }

    /// User activated a control
    pub fn activate(&mut self, dom: &mut dyn PageDom, control: NodeId, now: Instant) -> Activation {
        let Some(host) = self.host_of(control) else {
            return Activation::Ignored(IgnoreReason::UnknownControl);
        };
        if !dom.is_connected(host) {
            self.discard(host);
            return Activation::Ignored(IgnoreReason::Stale);
        }
        if !dom.is_connected(control) {
            return Activation::Ignored(IgnoreReason::Stale);
        }

        let Some(entry) = self.entries.get_mut(&host) else {
            return Activation::Ignored(IgnoreReason::UnknownControl);
        };
        if entry.state != OverlayState::Attached {
            trace!(host = host.raw(), state = %entry.state, "Activation while busy");
            return Activation::Ignored(IgnoreReason::Busy);
        }
        if !elapsed_at_least(entry.last_activation, now, self.min_activation_gap) {
            return Activation::Ignored(IgnoreReason::TooSoon);
        }

        let Ok(old) = entry.transition(OverlayState::Working) else {
            return Activation::Ignored(IgnoreReason::Busy);
        };
        entry.last_activation = Some(now);
        dom.set_control_appearance(control, OverlayState::Working);
        self.emit_state_change(host, control, old, OverlayState::Working);

        Activation::Accepted { host }
    }

    /// Finish a WORKING control; returns the new state
    pub fn settle(
        &mut self,
        dom: &mut dyn PageDom,
        control: NodeId,
        outcome: SettleOutcome,
        now: Instant,
    ) -> Result<OverlayState> {
        let host = self.host_of(control).ok_or(Error::UnknownControl(control))?;
        if !dom.is_connected(host) {
            self.discard(host);
            return Err(Error::StaleElement(host));
        }

        let entry = self
            .entries
            .get_mut(&host)
            .ok_or(Error::UnknownControl(control))?;
        let new_state = outcome.state();
        let old = entry.transition(new_state)?;
        entry.settled_at = Some(now);

        if dom.is_connected(control) {
            dom.set_control_appearance(control, new_state);
        }
        self.emit_state_change(host, control, old, new_state);
        Ok(new_state)
    }

    fn prune(&mut self, dom: &dyn PageDom) -> usize {
        let stale: Vec<NodeId> = self
            .entries
            .keys()
            .copied()
            .filter(|host| !dom.is_connected(*host))
            .collect();
        for host in &stale {
            self.discard(*host);
        }
        stale.len()
    }

    fn reset_expired(&mut self, dom: &mut dyn PageDom, now: Instant) -> usize {
        let expired: Vec<NodeId> = self
            .entries
            .values()
            .filter(|entry| entry.cooldown_expired(now, self.reset_delay))
            .map(|entry| entry.host)
            .collect();

        let mut reset = 0;
        for host in expired {
            let Some(entry) = self.entries.get_mut(&host) else {
                continue;
            };
            let Ok(old) = entry.transition(OverlayState::Attached) else {
                continue;
            };
            entry.settled_at = None;
            let control = entry.control;
            if dom.is_connected(control) {
                dom.set_control_appearance(control, OverlayState::Attached);
            }
            self.emit_state_change(host, control, old, OverlayState::Attached);
            reset += 1;
        }
        reset
    }

    fn discard(&mut self, host: NodeId) {
        if let Some(entry) = self.entries.remove(&host) {
            self.controls.remove(&entry.control);
            debug!(host = host.raw(), state = %entry.state, "Discarded detached element");
            self.emit(TrackerEvent::ControlDiscarded {
                session_id: self.session_id,
                host_node: host.raw(),
                timestamp: time::now(),
            });
        }
    }

    fn emit_state_change(&self, host: NodeId, control: NodeId, old: OverlayState, new: OverlayState) {
        self.emit(TrackerEvent::ControlStateChanged {
            session_id: self.session_id,
            host_node: host.raw(),
            control_node: control.raw(),
            old_state: old,
            new_state: new,
            timestamp: time::now(),
        });
    }

    fn emit(&self, event: TrackerEvent) {
        self.events.emit_lossy(event);
    }
}

impl std::fmt::Debug for OverlayManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayManager")
            .field("session_id", &self.session_id)
            .field("tracked", &self.entries.len())
            .finish()
    }
}
