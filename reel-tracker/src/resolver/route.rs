//! Route strategy: short code embedded in the page location

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::{ResolutionStrategy, ResolveContext};
use crate::media::MediaIndex;

static ROUTE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(?:p|reel|reels)/([A-Za-z0-9_-]+)").expect("valid route pattern"));

/// Reads `/p/<code>`, `/reel/<code>` or `/reels/<code>` from the location
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteStrategy;

impl RouteStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Short code in the location path, if any
    pub fn short_code(location: &str) -> Option<String> {
        let path = match Url::parse(location) {
            Ok(url) => url.path().to_string(),
            Err(_) => location
                .split(['?', '#'])
                .next()
                .unwrap_or(location)
                .to_string(),
        };
        ROUTE_PATTERN
            .captures(&path)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl ResolutionStrategy for RouteStrategy {
    fn name(&self) -> &'static str {
        "route"
    }

    fn locate(&self, ctx: &ResolveContext<'_>, _index: &MediaIndex) -> Option<String> {
        Self::short_code(ctx.location)
    }
}
