//! Cancellable repeating scan task
//!
//! The page gives no reliable signal when new media elements appear, so the
//! overlay is refreshed on a fixed period. The task lives exactly as long as
//! its page session: `stop()` (or dropping the handle) cancels it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Handle to a running scan task
#[derive(Debug)]
pub struct ScanLoop {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScanLoop {
    /// Spawn `tick` on a fixed `period`; the first tick fires immediately
    ///
    /// Must be called from within a tokio runtime. A zero `period` is
    /// rejected.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::Common(reel_common::Error::Config(
                "scan period must be greater than zero".to_string(),
            )));
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();

        info!(period_ms = period.as_millis() as u64, "Starting overlay scan loop");
        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        debug!("Overlay scan loop cancelled");
                        break;
                    }
                    _ = timer.tick() => tick(),
                }
            }
        });

        Ok(Self {
            token,
            handle: Some(handle),
        })
    }

    /// Request cancellation; the task exits at its next wake-up
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the task to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Overlay scan task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ScanLoop {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
