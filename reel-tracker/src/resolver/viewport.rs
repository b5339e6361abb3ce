//! Viewport strategy: the player nearest the viewport's vertical centre

use tracing::trace;

use super::framework_state::FrameworkProbe;
use super::{ResolutionStrategy, ResolveContext};
use crate::dom::{NodeId, PageDom};
use crate::media::MediaIndex;

/// Picks the most central rendered player and maps it to a record
///
/// Mapping tries the player's resource URL first, then the framework probe
/// on the player itself. Equal distances keep the first player in document
/// order.
#[derive(Debug, Clone, Copy)]
pub struct ViewportStrategy {
    probe: FrameworkProbe,
}

impl ViewportStrategy {
    pub fn new(probe: FrameworkProbe) -> Self {
        Self { probe }
    }

    /// Rendered, on-screen player closest to the viewport centre
    pub fn most_central_player(dom: &dyn PageDom) -> Option<NodeId> {
        let viewport = dom.viewport();
        let centre = viewport.vertical_center();

        let mut best: Option<(NodeId, f64)> = None;
        for player in dom.player_elements() {
            let Some(rect) = dom.bounding_rect(player) else {
                continue;
            };
            if rect.width <= 0.0 || rect.height <= 0.0 {
                continue;
            }
            if rect.top + rect.height <= 0.0 || rect.top >= viewport.height {
                continue;
            }
            let distance = (rect.vertical_center() - centre).abs();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((player, distance));
            }
        }
        best.map(|(player, _)| player)
    }
}

impl ResolutionStrategy for ViewportStrategy {
    fn name(&self) -> &'static str {
        "viewport"
    }

    fn locate(&self, ctx: &ResolveContext<'_>, index: &MediaIndex) -> Option<String> {
        let dom = ctx.dom?;
        let player = Self::most_central_player(dom)?;

        if let Some(url) = dom.resource_url(player) {
            if let Some(record) = index.find_by_resource_url(&url) {
                return Some(record.primary_key.clone());
            }
        }
        trace!(node = player.raw(), "Central player has no known resource url");
        self.probe.probe(dom, player, index)
    }
}
