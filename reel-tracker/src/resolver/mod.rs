//! Resolver
//!
//! Answers "which record is the user looking at right now?" by running an
//! ordered chain of strategies, most reliable first. A strategy only names a
//! primary key; the resolver accepts it when the store holds that key and
//! otherwise moves on to the next strategy.
//!
//! Resolution never fails. `None` means there is not enough information yet,
//! which is normal on a freshly loaded page.

pub mod framework_state;
pub mod recent;
pub mod route;
pub mod viewport;

use tracing::{debug, trace};

use reel_common::TrackerConfig;

use crate::dom::{NodeId, PageDom};
use crate::media::{MediaIndex, MediaRecord};

pub use framework_state::{FrameworkProbe, FrameworkStateStrategy};
pub use recent::RecentPlayableStrategy;
pub use route::RouteStrategy;
pub use viewport::ViewportStrategy;

/// Inputs available to a resolution attempt
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Current page location (full URL or path)
    pub location: &'a str,
    /// Element the user acted on, if any
    pub element: Option<NodeId>,
    /// Page document; `None` when resolving outside a live page
    pub dom: Option<&'a dyn PageDom>,
}

impl<'a> ResolveContext<'a> {
    /// Context carrying only the location
    pub fn new(location: &'a str) -> Self {
        Self {
            location,
            element: None,
            dom: None,
        }
    }

    pub fn with_dom(mut self, dom: &'a dyn PageDom) -> Self {
        self.dom = Some(dom);
        self
    }

    pub fn with_element(mut self, element: NodeId) -> Self {
        self.element = Some(element);
        self
    }
}

/// One link of the resolution chain
pub trait ResolutionStrategy: Send + Sync {
    /// Short identifier used in logs and in `Resolution::strategy`
    fn name(&self) -> &'static str;

    /// Propose a primary key, or `None` when this strategy has nothing
    fn locate(&self, ctx: &ResolveContext<'_>, index: &MediaIndex) -> Option<String>;
}

/// A resolved record and the strategy that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub record: &'a MediaRecord,
    pub strategy: &'static str,
}

/// Ordered strategy chain
pub struct Resolver {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl Resolver {
    /// Chain with no strategies; build it up with `with_strategy`
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Route, framework state, viewport centrality, then most recent playable
    pub fn standard(config: &TrackerConfig) -> Self {
        let probe = FrameworkProbe::new(config.probe_max_ancestors, config.props_max_depth);
        Self::empty()
            .with_strategy(RouteStrategy::new())
            .with_strategy(FrameworkStateStrategy::new(probe))
            .with_strategy(ViewportStrategy::new(probe))
            .with_strategy(RecentPlayableStrategy)
    }

    /// Append a strategy at the end of the chain
    pub fn with_strategy<S: ResolutionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Swap the strategy called `name` in place; returns false if absent
    pub fn replace_strategy(&mut self, name: &str, strategy: Box<dyn ResolutionStrategy>) -> bool {
        match self.strategies.iter_mut().find(|s| s.name() == name) {
            Some(slot) => {
                *slot = strategy;
                true
            }
            None => false,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain; first strategy whose key is in the store wins
    pub fn resolve<'i>(&self, ctx: &ResolveContext<'_>, index: &'i MediaIndex) -> Option<Resolution<'i>> {
        for strategy in &self.strategies {
            let Some(key) = strategy.locate(ctx, index) else {
                trace!(strategy = strategy.name(), "Strategy had no candidate");
                continue;
            };
            match index.get(&key) {
                Some(record) => {
                    debug!(
                        strategy = strategy.name(),
                        primary_key = %record.primary_key,
                        "Resolved current media"
                    );
                    return Some(Resolution {
                        record,
                        strategy: strategy.name(),
                    });
                }
                None => {
                    trace!(strategy = strategy.name(), key = %key, "Located key is not stored yet");
                }
            }
        }

        debug!(location = %ctx.location, records = index.len(), "No strategy resolved current media");
        None
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaCandidate;

    struct Fixed(&'static str, &'static str);

    impl ResolutionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn locate(&self, _ctx: &ResolveContext<'_>, _index: &MediaIndex) -> Option<String> {
            Some(self.1.to_string())
        }
    }

    fn index_with(keys: &[&str]) -> MediaIndex {
        let mut index = MediaIndex::new();
        for key in keys {
            index.upsert(&MediaCandidate::new(MediaRecord::new(*key)));
        }
        index
    }

    #[test]
    fn test_standard_chain_order() {
        let resolver = Resolver::standard(&TrackerConfig::default());
        assert_eq!(
            resolver.strategy_names(),
            vec!["route", "framework_state", "viewport", "recent_playable"]
        );
    }

    #[test]
    fn test_unstored_key_falls_through() {
        let index = index_with(&["known"]);
        let resolver = Resolver::empty()
            .with_strategy(Fixed("first", "unknown"))
            .with_strategy(Fixed("second", "known"));

        let resolution = resolver.resolve(&ResolveContext::new("/"), &index).unwrap();
        assert_eq!(resolution.strategy, "second");
        assert_eq!(resolution.record.primary_key, "known");
    }

    #[test]
    fn test_replace_strategy() {
        let index = index_with(&["a", "b"]);
        let mut resolver = Resolver::empty().with_strategy(Fixed("only", "a"));

        assert!(resolver.replace_strategy("only", Box::new(Fixed("only", "b"))));
        assert!(!resolver.replace_strategy("missing", Box::new(Fixed("x", "a"))));

        let resolution = resolver.resolve(&ResolveContext::new("/"), &index).unwrap();
        assert_eq!(resolution.record.primary_key, "b");
    }

    #[test]
    fn test_empty_index_resolves_nothing() {
        let resolver = Resolver::standard(&TrackerConfig::default());
        assert!(resolver
            .resolve(&ResolveContext::new("https://www.example.com/reel/abc123/"), &MediaIndex::new())
            .is_none());
    }
}
