//! Last-resort strategy: newest playable record in the store

use super::{ResolutionStrategy, ResolveContext};
use crate::media::MediaIndex;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecentPlayableStrategy;

impl ResolutionStrategy for RecentPlayableStrategy {
    fn name(&self) -> &'static str {
        "recent_playable"
    }

    fn locate(&self, _ctx: &ResolveContext<'_>, index: &MediaIndex) -> Option<String> {
        index
            .most_recent_playable()
            .map(|record| record.primary_key.clone())
    }
}
