//! Page session context
//!
//! One `PageSession` per page lifetime owns the record index, the resolver
//! chain and the overlay manager. Components never reach for ambient state;
//! everything goes through the session, so several independent sessions can
//! live side by side in one process.

use std::sync::{Arc, Mutex};

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reel_common::{time, EventBus, TrackerConfig, TrackerEvent};

use crate::dom::{NodeId, PageDom};
use crate::error::Result;
use crate::intercept::{Interceptor, NetworkExchange};
use crate::media::{ExtractionReport, MediaIndex, MediaRecord, RecordExtractor};
use crate::overlay::{Activation, OverlayManager, OverlayState, ScanLoop, ScanReport, SettleOutcome};
use crate::resolver::{ResolveContext, Resolution, Resolver};

/// Result of activating a control
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    /// Control is WORKING; the record should be handed to the submitter,
    /// which reports back through `settle`
    Resolved {
        host: NodeId,
        record: MediaRecord,
        strategy: &'static str,
    },
    /// Nothing resolved; the control was settled FAILED
    Unresolved { host: NodeId },
    /// Activation was not accepted
    Ignored(Activation),
}

pub struct PageSession {
    id: Uuid,
    config: TrackerConfig,
    events: EventBus,
    index: MediaIndex,
    interceptor: Interceptor,
    resolver: Resolver,
    overlay: OverlayManager,
}

impl PageSession {
    /// Start a session; fails when `config` does not validate
    pub fn new(config: TrackerConfig, events: EventBus) -> Result<Self> {
        config.validate()?;

        let id = Uuid::new_v4();
        let interceptor = Interceptor::new(RecordExtractor::new(config.extract_max_depth));
        let resolver = Resolver::standard(&config);
        let overlay = OverlayManager::new(&config, id, events.clone());

        info!(session_id = %id, strategies = ?resolver.strategy_names(), "Page session started");

        Ok(Self {
            id,
            config,
            events,
            index: MediaIndex::new(),
            interceptor,
            resolver,
            overlay,
        })
    }

    /// Swap in a custom resolver chain
    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn index(&self) -> &MediaIndex {
        &self.index
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.overlay
    }

    pub fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    /// Feed one completed network response through the interceptor
    pub fn observe_exchange(&mut self, exchange: &NetworkExchange) -> Option<ExtractionReport> {
        let report = self.interceptor.observe(&mut self.index, exchange)?;
        self.publish_extraction(&report);
        Some(report)
    }

    /// Extract from the page's embedded JSON data scripts
    pub fn ingest_embedded<'a, I>(&mut self, scripts: I) -> ExtractionReport
    where
        I: IntoIterator<Item = &'a str>,
    {
        let report = self.interceptor.ingest_embedded(&mut self.index, scripts);
        self.publish_extraction(&report);
        report
    }

    /// Current media for the given context, if determinable
    pub fn resolve<'s>(&'s self, ctx: &ResolveContext<'_>) -> Option<Resolution<'s>> {
        self.resolver.resolve(ctx, &self.index)
    }

    pub fn scan(&mut self, dom: &mut dyn PageDom, now: Instant) -> ScanReport {
        self.overlay.scan(dom, now)
    }

    pub fn enhance(&mut self, dom: &mut dyn PageDom, now: Instant) -> Option<ScanReport> {
        self.overlay.enhance(dom, now)
    }

    /// Activate a control and resolve its media in the same step
    ///
    /// Resolution uses the control itself as the acted-on element. When
    /// nothing resolves, the control is settled FAILED right away.
    pub fn activate(
        &mut self,
        dom: &mut dyn PageDom,
        control: NodeId,
        location: &str,
        now: Instant,
    ) -> Result<ActivationOutcome> {
        let activation = self.overlay.activate(dom, control, now);
        let Activation::Accepted { host } = activation else {
            debug!(control = control.raw(), ?activation, "Activation ignored");
            return Ok(ActivationOutcome::Ignored(activation));
        };

        let resolved = {
            let ctx = ResolveContext::new(location)
                .with_dom(&*dom)
                .with_element(control);
            self.resolver
                .resolve(&ctx, &self.index)
                .map(|r| (r.record.clone(), r.strategy))
        };

        match resolved {
            Some((record, strategy)) => Ok(ActivationOutcome::Resolved {
                host,
                record,
                strategy,
            }),
            None => {
                warn!(location = %location, host = host.raw(), "Could not determine current media");
                self.events.emit_lossy(TrackerEvent::ResolutionMissed {
                    session_id: self.id,
                    location: location.to_string(),
                    timestamp: time::now(),
                });
                self.overlay
                    .settle(dom, control, SettleOutcome::Failed, now)?;
                Ok(ActivationOutcome::Unresolved { host })
            }
        }
    }

    /// Report the submitter's result for a WORKING control
    pub fn settle(
        &mut self,
        dom: &mut dyn PageDom,
        control: NodeId,
        outcome: SettleOutcome,
        now: Instant,
    ) -> Result<OverlayState> {
        self.overlay.settle(dom, control, outcome, now)
    }

    fn publish_extraction(&self, report: &ExtractionReport) {
        for key in &report.stored {
            self.events.emit_lossy(TrackerEvent::RecordStored {
                session_id: self.id,
                primary_key: key.clone(),
                timestamp: time::now(),
            });
        }
        for key in &report.merged {
            self.events.emit_lossy(TrackerEvent::RecordMerged {
                session_id: self.id,
                primary_key: key.clone(),
                timestamp: time::now(),
            });
        }
    }
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("id", &self.id)
            .field("records", &self.index.len())
            .field("overlay", &self.overlay)
            .finish()
    }
}

/// Refresh the overlay on the configured period until the returned loop is
/// stopped
///
/// Each tick runs a full enhancement pass when its cool-down allows,
/// otherwise a plain scan.
pub fn spawn_scan_loop<D>(
    session: Arc<Mutex<PageSession>>,
    dom: Arc<Mutex<D>>,
) -> Result<ScanLoop>
where
    D: PageDom + Send + 'static,
{
    let period = match session.lock() {
        Ok(guard) => guard.config.scan_interval(),
        Err(poisoned) => poisoned.into_inner().config.scan_interval(),
    };

    ScanLoop::spawn(period, move || {
        let (Ok(mut session), Ok(mut dom)) = (session.lock(), dom.lock()) else {
            warn!("Skipping overlay scan: session state poisoned");
            return;
        };
        let now = Instant::now();
        if session.enhance(&mut *dom, now).is_none() {
            session.scan(&mut *dom, now);
        }
    })
}
