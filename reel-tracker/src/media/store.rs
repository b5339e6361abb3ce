//! Canonical Record Store and Secondary Index
//!
//! `MediaIndex` owns the primary-key → record map plus two auxiliary maps
//! from alternate id namespaces to primary keys. It is mutated only through
//! `upsert`; everything else is read-only.
//!
//! Invariant: an alternate id is written only after its record is stored,
//! so every secondary entry points at a record that exists.

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, trace};

use super::record::{MediaCandidate, MediaRecord};

/// Result of one upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of the primary key
    Inserted,
    /// Known primary key; `changed` reports whether any field was filled
    Merged { changed: bool },
    /// Candidate had no primary key; nothing was written
    Rejected,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    /// Insertion sequence, used for stable ordering
    seq: u64,
    record: MediaRecord,
}

/// Session-scoped media record index
#[derive(Debug, Default)]
pub struct MediaIndex {
    records: HashMap<String, StoredRecord>,
    media_ids: HashMap<String, String>,
    distribution_ids: HashMap<String, String>,
    next_seq: u64,
}

impl MediaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record or fill missing fields of a known one
    ///
    /// Alternate ids on the candidate are (re)written in both cases.
    /// A candidate with an empty primary key is rejected.
    pub fn upsert(&mut self, candidate: &MediaCandidate) -> UpsertOutcome {
        let key = candidate.primary_key();
        if key.is_empty() {
            debug!("Ignoring media candidate without primary key");
            return UpsertOutcome::Rejected;
        }

        let outcome = match self.records.get_mut(key) {
            Some(stored) => {
                let changed = stored.record.fill_missing(&candidate.record);
                if changed {
                    debug!(primary_key = %key, "Merged partial media record");
                } else {
                    trace!(primary_key = %key, "Media record already complete for payload");
                }
                UpsertOutcome::Merged { changed }
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let mut record = candidate.record.clone();
                record.clear_blanks();
                debug!(
                    primary_key = %key,
                    playable = record.is_playable(),
                    carousel = record.carousel.is_some(),
                    "Stored new media record"
                );
                self.records
                    .insert(key.to_string(), StoredRecord { seq, record });
                UpsertOutcome::Inserted
            }
        };

        for alt in &candidate.media_ids {
            map_alt_id(&mut self.media_ids, alt, key, "media");
        }
        for alt in &candidate.distribution_ids {
            map_alt_id(&mut self.distribution_ids, alt, key, "distribution");
        }

        outcome
    }

    pub fn get(&self, primary_key: &str) -> Option<&MediaRecord> {
        self.records.get(primary_key).map(|stored| &stored.record)
    }

    pub fn contains(&self, primary_key: &str) -> bool {
        self.records.contains_key(primary_key)
    }

    /// Primary key for a platform media id
    pub fn lookup_media_id(&self, alt_id: &str) -> Option<&str> {
        self.media_ids.get(alt_id).map(String::as_str)
    }

    /// Primary key for a backend/distribution id
    pub fn lookup_distribution_id(&self, alt_id: &str) -> Option<&str> {
        self.distribution_ids.get(alt_id).map(String::as_str)
    }

    /// Resolve an id of unknown namespace: primary key, then media ids,
    /// then distribution ids
    pub fn lookup_any(&self, id: &str) -> Option<&str> {
        if let Some((key, _)) = self.records.get_key_value(id) {
            return Some(key.as_str());
        }
        self.lookup_media_id(id)
            .or_else(|| self.lookup_distribution_id(id))
    }

    /// Earliest-stored record that references `url` as a resource
    pub fn find_by_resource_url(&self, url: &str) -> Option<&MediaRecord> {
        self.records
            .values()
            .filter(|stored| stored.record.references_url(url))
            .min_by_key(|stored| stored.seq)
            .map(|stored| &stored.record)
    }

    /// Newest record with a playable resource
    ///
    /// Ordered by `created_at` descending with missing timestamps last;
    /// ties go to the record stored first.
    pub fn most_recent_playable(&self) -> Option<&MediaRecord> {
        self.records
            .values()
            .filter(|stored| stored.record.is_playable())
            .min_by(|a, b| recency_order(a, b))
            .map(|stored| &stored.record)
    }

    /// All records in insertion order
    pub fn records(&self) -> Vec<&MediaRecord> {
        let mut stored: Vec<&StoredRecord> = self.records.values().collect();
        stored.sort_by_key(|s| s.seq);
        stored.into_iter().map(|s| &s.record).collect()
    }

    /// `(alt_id, primary_key)` pairs of the media id map
    pub fn media_id_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.media_ids.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `(alt_id, primary_key)` pairs of the distribution id map
    pub fn distribution_id_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.distribution_ids
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn map_alt_id(map: &mut HashMap<String, String>, alt: &str, key: &str, namespace: &str) {
    if alt.is_empty() {
        return;
    }
    if let Some(previous) = map.insert(alt.to_string(), key.to_string()) {
        if previous != key {
            debug!(
                namespace,
                alt_id = %alt,
                from = %previous,
                to = %key,
                "Alternate id remapped"
            );
        }
    }
}

fn recency_order(a: &StoredRecord, b: &StoredRecord) -> Ordering {
    let by_time = match (a.record.created_at, b.record.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then(a.seq.cmp(&b.seq))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &str) -> MediaCandidate {
        MediaCandidate::new(MediaRecord::new(key))
    }

    fn playable(key: &str, created_at: Option<i64>) -> MediaCandidate {
        let mut c = candidate(key);
        c.record.created_at = created_at;
        c.record.media_url = Some(format!("https://cdn/{}.mp4", key));
        c
    }

    #[test]
    fn test_upsert_inserts_then_merges() {
        let mut index = MediaIndex::new();
        let mut first = candidate("abc123");
        first.record.engagement.like_count = Some(10);

        assert_eq!(index.upsert(&first), UpsertOutcome::Inserted);

        let mut second = candidate("abc123");
        second.record.author_handle = Some("someone".to_string());
        assert_eq!(
            index.upsert(&second),
            UpsertOutcome::Merged { changed: true }
        );

        let record = index.get("abc123").unwrap();
        assert_eq!(record.engagement.like_count, Some(10));
        assert_eq!(record.author_handle.as_deref(), Some("someone"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut index = MediaIndex::new();
        let mut c = playable("abc123", Some(5));
        c.media_ids.push("111_222".to_string());

        index.upsert(&c);
        let after_once = index.get("abc123").cloned();
        assert_eq!(index.upsert(&c), UpsertOutcome::Merged { changed: false });

        assert_eq!(index.get("abc123").cloned(), after_once);
        assert_eq!(index.media_id_entries().count(), 1);
    }

    #[test]
    fn test_alt_ids_written_on_merge() {
        let mut index = MediaIndex::new();
        index.upsert(&candidate("abc123"));

        let mut later = candidate("abc123");
        later.distribution_ids.push("17890".to_string());
        index.upsert(&later);

        assert_eq!(index.lookup_distribution_id("17890"), Some("abc123"));
        assert_eq!(index.lookup_any("17890"), Some("abc123"));
        assert_eq!(index.lookup_any("abc123"), Some("abc123"));
        assert_eq!(index.lookup_any("missing"), None);
    }

    #[test]
    fn test_most_recent_playable_orders_by_created_at() {
        let mut index = MediaIndex::new();
        index.upsert(&playable("old", Some(100)));
        index.upsert(&playable("undated", None));
        index.upsert(&playable("new", Some(200)));
        index.upsert(&candidate("not_playable"));

        assert_eq!(index.most_recent_playable().unwrap().primary_key, "new");
    }

    #[test]
    fn test_most_recent_playable_nulls_last_and_ties_first_stored() {
        let mut index = MediaIndex::new();
        index.upsert(&playable("undated", None));
        index.upsert(&playable("first", Some(100)));
        index.upsert(&playable("second", Some(100)));

        assert_eq!(index.most_recent_playable().unwrap().primary_key, "first");
    }

    #[test]
    fn test_most_recent_playable_empty() {
        let mut index = MediaIndex::new();
        assert!(index.most_recent_playable().is_none());
        index.upsert(&candidate("still_image_only"));
        assert!(index.most_recent_playable().is_none());
    }

    #[test]
    fn test_find_by_resource_url() {
        let mut index = MediaIndex::new();
        index.upsert(&playable("abc123", None));
        assert_eq!(
            index
                .find_by_resource_url("https://cdn/abc123.mp4")
                .map(|r| r.primary_key.as_str()),
            Some("abc123")
        );
        assert!(index.find_by_resource_url("blob:https://page/1").is_none());
    }

    #[test]
    fn test_empty_values_are_filled_later() {
        let mut index = MediaIndex::new();
        index.upsert(&playable("dated", Some(100)));

        let mut blank = candidate("abc123");
        blank.record.created_at = Some(500);
        blank.record.media_url = Some(String::new());
        blank.record.carousel = Some(Vec::new());
        assert_eq!(index.upsert(&blank), UpsertOutcome::Inserted);
        assert_eq!(index.get("abc123").unwrap().media_url, None);
        assert_eq!(index.get("abc123").unwrap().carousel, None);

        // An empty URL never wins the recency pick
        assert_eq!(index.most_recent_playable().unwrap().primary_key, "dated");

        let mut full = candidate("abc123");
        full.record.media_url = Some("https://cdn/abc123.mp4".to_string());
        full.record.carousel = Some(vec!["https://cdn/1.jpg".to_string()]);
        assert_eq!(index.upsert(&full), UpsertOutcome::Merged { changed: true });

        let record = index.get("abc123").unwrap();
        assert_eq!(record.media_url.as_deref(), Some("https://cdn/abc123.mp4"));
        assert_eq!(record.carousel.as_ref().map(Vec::len), Some(1));
        assert_eq!(index.most_recent_playable().unwrap().primary_key, "abc123");
    }

    #[test]
    fn test_empty_primary_key_rejected() {
        let mut index = MediaIndex::new();
        let mut c = playable("", Some(1));
        c.media_ids.push("111_222".to_string());

        assert_eq!(index.upsert(&c), UpsertOutcome::Rejected);
        assert!(index.is_empty());
        assert_eq!(index.media_id_entries().count(), 0);
        assert!(index.most_recent_playable().is_none());
    }

    #[test]
    fn test_records_in_insertion_order() {
        let mut index = MediaIndex::new();
        for key in ["c", "a", "b"] {
            index.upsert(&candidate(key));
        }
        let keys: Vec<&str> = index
            .records()
            .into_iter()
            .map(|r| r.primary_key.as_str())
            .collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }
}
