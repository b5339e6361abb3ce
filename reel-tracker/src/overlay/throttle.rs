//! Cool-down gate with an in-progress guard

use std::time::Duration;

use tokio::time::Instant;

/// Lets an operation start at most once per `cooldown`, and never while a
/// previous run is still open
#[derive(Debug, Clone)]
pub struct Throttle {
    cooldown: Duration,
    last_started: Option<Instant>,
    in_progress: bool,
}

impl Throttle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_started: None,
            in_progress: false,
        }
    }

    /// Open a run if allowed; the caller must `finish` it
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if self.in_progress || !elapsed_at_least(self.last_started, now, self.cooldown) {
            return false;
        }
        self.in_progress = true;
        self.last_started = Some(now);
        true
    }

    pub fn finish(&mut self) {
        self.in_progress = false;
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }
}

/// True when `last` is unset or at least `gap` before `now`
pub fn elapsed_at_least(last: Option<Instant>, now: Instant, gap: Duration) -> bool {
    last.map_or(true, |last| now.saturating_duration_since(last) >= gap)
}
