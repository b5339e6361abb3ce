//! Framework-state strategy
//!
//! The page's UI framework hangs its render state off DOM nodes as expando
//! properties. Starting at the element the user acted on and walking up
//! through its ancestors, we read those props and look for any identifier
//! that maps to a stored record.

use serde_json::Value;
use tracing::trace;

use super::{ResolutionStrategy, ResolveContext};
use crate::dom::{NodeId, PageDom};
use crate::media::extract::id_string;
use crate::media::MediaIndex;

/// Props stored directly on the node
const PROPS_PREFIX: &str = "__reactProps$";

/// Render-tree handles whose props sit under `memoizedProps`/`pendingProps`
const FIBER_PREFIXES: &[&str] = &["__reactFiber$", "__reactInternalInstance$"];

const PRIMARY_FIELDS: &[&str] = &["code", "shortcode"];
const MEDIA_ID_FIELDS: &[&str] = &["media_id", "mediaId", "id"];
const DISTRIBUTION_ID_FIELDS: &[&str] = &["pk", "video_id", "videoId", "fb_video_id"];

/// Ancestor walk plus bounded props search, shared with the viewport strategy
#[derive(Debug, Clone, Copy)]
pub struct FrameworkProbe {
    max_ancestors: usize,
    props_max_depth: usize,
}

impl FrameworkProbe {
    pub fn new(max_ancestors: usize, props_max_depth: usize) -> Self {
        Self {
            max_ancestors,
            props_max_depth,
        }
    }

    /// Primary key of the first stored record referenced from `start` or
    /// one of its ancestors
    ///
    /// `start` is level 0; at most `max_ancestors` levels are read, so the
    /// highest node inspected is `max_ancestors - 1` steps above `start`.
    pub fn probe(&self, dom: &dyn PageDom, start: NodeId, index: &MediaIndex) -> Option<String> {
        let mut node = Some(start);
        for level in 0..self.max_ancestors {
            let current = node?;
            if !dom.is_connected(current) {
                trace!(node = current.raw(), "Probe start is detached");
                return None;
            }

            for (name, value) in dom.expando_properties(current) {
                let Some(props) = framework_props(&name, &value) else {
                    continue;
                };
                if let Some(key) = self.search(props, 0, index) {
                    trace!(level, node = current.raw(), primary_key = %key, "Framework props matched");
                    return Some(key);
                }
            }
            node = dom.parent(current);
        }
        None
    }

    fn search(&self, value: &Value, depth: usize, index: &MediaIndex) -> Option<String> {
        if depth > self.props_max_depth {
            return None;
        }
        match value {
            Value::Object(obj) => {
                for field in PRIMARY_FIELDS {
                    if let Some(code) = obj.get(*field).and_then(Value::as_str) {
                        if index.contains(code) {
                            return Some(code.to_string());
                        }
                    }
                }
                for field in MEDIA_ID_FIELDS {
                    let found = obj
                        .get(*field)
                        .and_then(id_string)
                        .and_then(|id| index.lookup_media_id(&id).map(str::to_string));
                    if found.is_some() {
                        return found;
                    }
                }
                for field in DISTRIBUTION_ID_FIELDS {
                    let found = obj
                        .get(*field)
                        .and_then(id_string)
                        .and_then(|id| index.lookup_distribution_id(&id).map(str::to_string));
                    if found.is_some() {
                        return found;
                    }
                }
                obj.iter()
                    .filter(|(key, _)| key.as_str() != "children")
                    .find_map(|(_, child)| self.search(child, depth + 1, index))
            }
            Value::Array(items) => items
                .iter()
                .find_map(|item| self.search(item, depth + 1, index)),
            _ => None,
        }
    }
}

/// Props object carried by a framework expando, if `name` is one
fn framework_props<'v>(name: &str, value: &'v Value) -> Option<&'v Value> {
    if name.starts_with(PROPS_PREFIX) {
        return Some(value);
    }
    if FIBER_PREFIXES.iter().any(|prefix| name.starts_with(prefix)) {
        return value
            .get("memoizedProps")
            .filter(|props| !props.is_null())
            .or_else(|| value.get("pendingProps"));
    }
    None
}

/// Probes the acted-on element and its ancestors
#[derive(Debug, Clone, Copy)]
pub struct FrameworkStateStrategy {
    probe: FrameworkProbe,
}

impl FrameworkStateStrategy {
    pub fn new(probe: FrameworkProbe) -> Self {
        Self { probe }
    }
}

impl ResolutionStrategy for FrameworkStateStrategy {
    fn name(&self) -> &'static str {
        "framework_state"
    }

    fn locate(&self, ctx: &ResolveContext<'_>, index: &MediaIndex) -> Option<String> {
        let (dom, element) = (ctx.dom?, ctx.element?);
        self.probe.probe(dom, element, index)
    }
}
