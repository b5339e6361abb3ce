//! Media record types
//!
//! A `MediaRecord` is one piece of media the host page has shown. Records are
//! assembled piecemeal: the same media arrives across several responses, each
//! carrying a different subset of fields. Merging is fill-if-missing, so a
//! field never goes back to `None` and never changes once set. Empty strings
//! and empty lists count as missing.

use serde::{Deserialize, Serialize};

/// Best-known engagement counters; each is independently optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub play_count: Option<u64>,
}

/// Canonical record for one media item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Platform short code; assigned at first sighting, never changes
    pub primary_key: String,
    /// Source-reported creation time (unix seconds), used for recency only
    pub created_at: Option<i64>,
    pub engagement: Engagement,
    pub author_handle: Option<String>,
    /// Playable resource location
    pub media_url: Option<String>,
    /// Still image, used when `media_url` is absent
    pub alt_url: Option<String>,
    /// Resource URLs of a multi-item post, in order
    pub carousel: Option<Vec<String>>,
}

impl MediaRecord {
    /// Empty record for a newly seen primary key
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            created_at: None,
            engagement: Engagement::default(),
            author_handle: None,
            media_url: None,
            alt_url: None,
            carousel: None,
        }
    }

    /// Whether the record has a playable resource
    pub fn is_playable(&self) -> bool {
        !is_missing(&self.media_url)
    }

    /// Best URL to hand to the submission collaborator
    pub fn best_url(&self) -> Option<&str> {
        self.media_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.alt_url.as_deref().filter(|url| !url.is_empty()))
    }

    /// Reset empty strings and empty lists to `None`
    pub fn clear_blanks(&mut self) {
        clear(&mut self.author_handle);
        clear(&mut self.media_url);
        clear(&mut self.alt_url);
        clear(&mut self.carousel);
    }

    /// Whether any of the record's resources is `url`
    pub fn references_url(&self, url: &str) -> bool {
        self.media_url.as_deref() == Some(url)
            || self.alt_url.as_deref() == Some(url)
            || self
                .carousel
                .as_ref()
                .is_some_and(|items| items.iter().any(|item| item == url))
    }

    /// Fill missing fields from `incoming`; returns whether anything changed
    ///
    /// Existing values always win, even when `incoming` disagrees.
    pub fn fill_missing(&mut self, incoming: &MediaRecord) -> bool {
        let mut changed = false;
        changed |= fill(&mut self.created_at, &incoming.created_at);
        changed |= fill(&mut self.engagement.like_count, &incoming.engagement.like_count);
        changed |= fill(
            &mut self.engagement.comment_count,
            &incoming.engagement.comment_count,
        );
        changed |= fill(&mut self.engagement.play_count, &incoming.engagement.play_count);
        changed |= fill(&mut self.author_handle, &incoming.author_handle);
        changed |= fill(&mut self.media_url, &incoming.media_url);
        changed |= fill(&mut self.alt_url, &incoming.alt_url);
        changed |= fill(&mut self.carousel, &incoming.carousel);
        changed
    }
}

/// Values that can be present yet carry nothing
trait Blank {
    fn is_blank(&self) -> bool {
        false
    }
}

impl Blank for i64 {}
impl Blank for u64 {}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

fn is_missing<T: Blank>(slot: &Option<T>) -> bool {
    slot.as_ref().map_or(true, Blank::is_blank)
}

fn fill<T: Clone + Blank>(slot: &mut Option<T>, incoming: &Option<T>) -> bool {
    if !is_missing(slot) || is_missing(incoming) {
        return false;
    }
    *slot = incoming.clone();
    true
}

fn clear<T: Blank>(slot: &mut Option<T>) {
    if is_missing(slot) {
        *slot = None;
    }
}

/// A media-shaped fragment found in a payload, ready for upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCandidate {
    pub record: MediaRecord,
    /// Platform media ids (`id`)
    pub media_ids: Vec<String>,
    /// Backend/distribution ids (`pk`, `video_id`, `fb_video_id`)
    pub distribution_ids: Vec<String>,
}

impl MediaCandidate {
    pub fn new(record: MediaRecord) -> Self {
        Self {
            record,
            media_ids: Vec::new(),
            distribution_ids: Vec::new(),
        }
    }

    pub fn primary_key(&self) -> &str {
        &self.record.primary_key
    }
}
