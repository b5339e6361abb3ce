//! Record Extractor
//!
//! Finds media records anywhere inside an arbitrary JSON payload. Two
//! mechanisms run together:
//!
//! 1. **Structural signature** - any object carrying both a primary-id field
//!    (`code`/`shortcode`) and an engagement-count key is a candidate,
//!    whatever schema version or nesting put it there.
//! 2. **Named containers** - known feed/connection/item-list keys are
//!    iterated explicitly instead of being walked node by node.
//!
//! The walk is depth-bounded. JSON parse trees are acyclic so no visited set
//! is kept; the cap only guards against pathological nesting.

use serde_json::{Map, Value};
use tracing::trace;

use super::record::{Engagement, MediaCandidate, MediaRecord};
use super::store::{MediaIndex, UpsertOutcome};

/// Keys whose presence marks an object as carrying engagement counts
const ENGAGEMENT_KEYS: &[&str] = &[
    "like_count",
    "comment_count",
    "play_count",
    "ig_play_count",
    "view_count",
    "video_view_count",
];

/// Container keys holding `edges[].node`
const EDGE_CONTAINERS: &[&str] = &[
    "xdt_api__v1__feed__timeline__connection",
    "xdt_api__v1__clips__home__connection_v2",
    "timeline",
    "clips",
];

/// Container keys holding `items[]`
const ITEM_CONTAINERS: &[&str] = &["xdt_api__v1__media__shortcode__web_info"];

/// Outcome of one extraction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Media-shaped fragments handed to the store
    pub candidates: usize,
    /// Container children dropped for lacking a primary key
    pub discarded: usize,
    /// Primary keys seen for the first time
    pub stored: Vec<String>,
    /// Primary keys whose record gained fields
    pub merged: Vec<String>,
}

impl ExtractionReport {
    pub fn is_empty(&self) -> bool {
        self.candidates == 0 && self.discarded == 0
    }

    fn record(&mut self, key: &str, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.stored.push(key.to_string()),
            UpsertOutcome::Merged { changed: true } => self.merged.push(key.to_string()),
            UpsertOutcome::Merged { changed: false } => {}
            UpsertOutcome::Rejected => {
                self.discarded += 1;
                return;
            }
        }
        self.candidates += 1;
    }

    /// Fold another report into this one
    pub fn absorb(&mut self, other: ExtractionReport) {
        self.candidates += other.candidates;
        self.discarded += other.discarded;
        self.stored.extend(other.stored);
        self.merged.extend(other.merged);
    }
}

/// Depth-bounded JSON walker feeding a `MediaIndex`
#[derive(Debug, Clone, Copy)]
pub struct RecordExtractor {
    max_depth: usize,
}

impl RecordExtractor {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Walk the whole payload and upsert every candidate found
    pub fn extract(&self, payload: &Value, index: &mut MediaIndex) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        self.walk(payload, 0, index, &mut report);
        report
    }

    /// Upsert each element of a known item list
    ///
    /// With `unwrap_media`, an element's `media` child is used when present
    /// (feed responses wrap items that way).
    pub fn extract_items(
        &self,
        items: &[Value],
        unwrap_media: bool,
        index: &mut MediaIndex,
    ) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        for item in items {
            let item = if unwrap_media {
                item.get("media").unwrap_or(item)
            } else {
                item
            };
            self.accept_container_child(item, 1, index, &mut report);
        }
        report
    }

    fn walk(&self, value: &Value, depth: usize, index: &mut MediaIndex, report: &mut ExtractionReport) {
        if depth > self.max_depth {
            trace!(depth, "Extractor depth cap reached");
            return;
        }

        match value {
            Value::Array(items) => {
                for item in items {
                    self.walk(item, depth + 1, index, report);
                }
            }
            Value::Object(obj) => {
                if has_media_signature(obj) {
                    if let Some(candidate) = candidate_from_object(obj) {
                        let outcome = index.upsert(&candidate);
                        report.record(candidate.primary_key(), outcome);
                    }
                }

                for (key, child) in obj {
                    if !child.is_object() && !child.is_array() {
                        continue;
                    }
                    if self.container(key, child, depth + 1, index, report) {
                        continue;
                    }
                    self.walk(child, depth + 1, index, report);
                }
            }
            _ => {}
        }
    }

    /// Iterate a named container explicitly; returns false when `key` is not
    /// a known container or the value does not have the expected shape
    fn container(
        &self,
        key: &str,
        value: &Value,
        depth: usize,
        index: &mut MediaIndex,
        report: &mut ExtractionReport,
    ) -> bool {
        if EDGE_CONTAINERS.contains(&key) {
            let Some(edges) = value.get("edges").and_then(Value::as_array) else {
                return false;
            };
            for edge in edges {
                let Some(node) = edge.get("node") else {
                    continue;
                };
                let item = node.get("media").filter(|m| m.is_object()).unwrap_or(node);
                self.accept_container_child(item, depth + 1, index, report);
            }
            return true;
        }

        if ITEM_CONTAINERS.contains(&key) {
            let Some(items) = value.get("items").and_then(Value::as_array) else {
                return false;
            };
            for item in items {
                self.accept_container_child(item, depth + 1, index, report);
            }
            return true;
        }

        false
    }

    /// Container children only need a primary key; anything else is walked
    /// generically in case the record sits further down
    fn accept_container_child(
        &self,
        item: &Value,
        depth: usize,
        index: &mut MediaIndex,
        report: &mut ExtractionReport,
    ) {
        let Some(obj) = item.as_object() else {
            return;
        };
        match candidate_from_object(obj) {
            Some(candidate) => {
                let outcome = index.upsert(&candidate);
                report.record(candidate.primary_key(), outcome);
            }
            None if has_media_fields(obj) => {
                report.discarded += 1;
                trace!("Discarded media-shaped item without a primary key");
            }
            None => self.walk(item, depth, index, report),
        }
    }
}

/// Primary-id field plus at least one engagement-count key
pub fn has_media_signature(obj: &Map<String, Value>) -> bool {
    primary_key_of(obj).is_some() && ENGAGEMENT_KEYS.iter().any(|k| obj.contains_key(*k))
}

fn has_media_fields(obj: &Map<String, Value>) -> bool {
    ENGAGEMENT_KEYS.iter().any(|k| obj.contains_key(*k))
        || obj.contains_key("video_versions")
        || obj.contains_key("image_versions2")
}

fn primary_key_of(obj: &Map<String, Value>) -> Option<&str> {
    ["code", "shortcode"]
        .iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Build a candidate from a media-shaped object; `None` without a primary key
pub fn candidate_from_object(obj: &Map<String, Value>) -> Option<MediaCandidate> {
    let primary_key = primary_key_of(obj)?;
    let value = |pointer: &str| field_at(obj, pointer);
    let text = |pointer: &str| value(pointer).and_then(non_empty_str);
    let count = |pointer: &str| value(pointer).and_then(Value::as_u64);

    let record = MediaRecord {
        primary_key: primary_key.to_string(),
        created_at: value("/caption/created_at")
            .and_then(as_timestamp)
            .or_else(|| value("/taken_at").and_then(as_timestamp)),
        engagement: Engagement {
            like_count: count("/like_count"),
            comment_count: count("/comment_count"),
            play_count: count("/ig_play_count")
                .or_else(|| count("/play_count"))
                .or_else(|| count("/view_count"))
                .or_else(|| count("/video_view_count")),
        },
        author_handle: text("/caption/user/username")
            .or_else(|| text("/owner/username"))
            .or_else(|| text("/user/username")),
        media_url: text("/video_versions/0/url").or_else(|| text("/video_url")),
        alt_url: text("/image_versions2/candidates/0/url").or_else(|| text("/display_url")),
        carousel: value("/carousel_media")
            .and_then(Value::as_array)
            .map(|items| carousel_urls(items))
            .filter(|urls| !urls.is_empty()),
    };

    let mut candidate = MediaCandidate::new(record);
    if let Some(id) = obj.get("id").and_then(id_string) {
        candidate.media_ids.push(id);
    }
    for key in ["pk", "video_id", "fb_video_id"] {
        if let Some(id) = obj.get(key).and_then(id_string) {
            if !candidate.distribution_ids.contains(&id) {
                candidate.distribution_ids.push(id);
            }
        }
    }
    Some(candidate)
}

/// JSON-pointer lookup rooted at an object (`/video_versions/0/url`)
fn field_at<'a>(obj: &'a Map<String, Value>, pointer: &str) -> Option<&'a Value> {
    let path = pointer.strip_prefix('/').unwrap_or(pointer);
    match path.split_once('/') {
        Some((head, rest)) => obj.get(head)?.pointer(&format!("/{}", rest)),
        None => obj.get(path),
    }
}

/// Video URL then image URL of each carousel child, empties dropped
fn carousel_urls(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .flat_map(|item| {
            [
                item.pointer("/video_versions/0/url"),
                item.pointer("/image_versions2/candidates/0/url"),
            ]
        })
        .flatten()
        .filter_map(non_empty_str)
        .collect()
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn as_timestamp(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .filter(|ts| *ts > 0)
}

/// Normalize a string or integer id to its string form
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string())),
        _ => None,
    }
}
