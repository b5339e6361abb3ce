//! Interception Layer
//!
//! Observes completed network responses made by the host page and feeds the
//! media-bearing ones to the extractor. The exchange is only read; the page
//! always gets its response unchanged, and nothing here can fail outward.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::media::{ExtractionReport, MediaIndex, RecordExtractor};

/// One completed response as seen on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkExchange {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl NetworkExchange {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Endpoint families known to carry media payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Structured-query endpoint; payload shape varies, walked in full
    GraphQl,
    /// Single-media info endpoint; `items[]`
    MediaInfo,
    /// Feed endpoint; `items[]`, each possibly wrapping `media`
    Feed,
}

impl ResponseKind {
    /// Classify a request URL; `None` for endpoints that are not observed
    pub fn classify(url: &str) -> Option<Self> {
        if url.contains("/graphql/query") {
            Some(Self::GraphQl)
        } else if url.contains("/api/v1/media/") && url.contains("/info/") {
            Some(Self::MediaInfo)
        } else if url.contains("/api/v1/feed/") {
            Some(Self::Feed)
        } else {
            None
        }
    }
}

/// Routes observed responses to the extractor
#[derive(Debug, Clone, Copy)]
pub struct Interceptor {
    extractor: RecordExtractor,
}

impl Interceptor {
    pub fn new(extractor: RecordExtractor) -> Self {
        Self { extractor }
    }

    /// Observe one exchange; `None` when it was not media-bearing
    ///
    /// Failed requests, unknown endpoints and bodies that are not JSON are
    /// ignored silently.
    pub fn observe(&self, index: &mut MediaIndex, exchange: &NetworkExchange) -> Option<ExtractionReport> {
        if !exchange.is_success() {
            trace!(url = %exchange.url, status = exchange.status, "Skipping failed response");
            return None;
        }
        let kind = ResponseKind::classify(&exchange.url)?;

        let payload: Value = match serde_json::from_str(&exchange.body) {
            Ok(payload) => payload,
            Err(e) => {
                trace!(url = %exchange.url, error = %e, "Response body is not JSON");
                return None;
            }
        };

        let report = match kind {
            ResponseKind::GraphQl => self.extractor.extract(&payload, index),
            ResponseKind::MediaInfo => self.extractor.extract_items(items_of(&payload), false, index),
            ResponseKind::Feed => self.extractor.extract_items(items_of(&payload), true, index),
        };

        debug!(
            url = %exchange.url,
            kind = ?kind,
            candidates = report.candidates,
            stored = report.stored.len(),
            merged = report.merged.len(),
            "Observed media response"
        );
        Some(report)
    }

    /// Run full extraction over the page's embedded JSON script payloads
    ///
    /// Scripts that do not parse are skipped.
    pub fn ingest_embedded<'a, I>(&self, index: &mut MediaIndex, scripts: I) -> ExtractionReport
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut report = ExtractionReport::default();
        let mut skipped = 0usize;
        for script in scripts {
            match serde_json::from_str::<Value>(script) {
                Ok(payload) => report.absorb(self.extractor.extract(&payload, index)),
                Err(_) => skipped += 1,
            }
        }
        debug!(
            candidates = report.candidates,
            stored = report.stored.len(),
            skipped,
            "Ingested embedded page data"
        );
        report
    }
}

fn items_of(payload: &Value) -> &[Value] {
    payload
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interceptor() -> Interceptor {
        Interceptor::new(RecordExtractor::new(15))
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            ResponseKind::classify("https://www.example.com/graphql/query/?doc_id=1"),
            Some(ResponseKind::GraphQl)
        );
        assert_eq!(
            ResponseKind::classify("https://i.example.com/api/v1/media/3300/info/"),
            Some(ResponseKind::MediaInfo)
        );
        assert_eq!(
            ResponseKind::classify("https://i.example.com/api/v1/feed/timeline/"),
            Some(ResponseKind::Feed)
        );
        assert_eq!(ResponseKind::classify("https://i.example.com/api/v1/media/3300/likers/"), None);
        assert_eq!(ResponseKind::classify("https://www.example.com/static/app.js"), None);
    }

    #[test]
    fn test_ignores_failed_and_non_json() {
        let mut index = MediaIndex::new();
        let failed = NetworkExchange::new(
            "https://x/graphql/query",
            500,
            r#"{"code":"abc","like_count":1}"#,
        );
        assert!(interceptor().observe(&mut index, &failed).is_none());

        let html = NetworkExchange::new("https://x/graphql/query", 200, "<html></html>");
        assert!(interceptor().observe(&mut index, &html).is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_media_info_items() {
        let mut index = MediaIndex::new();
        let exchange = NetworkExchange::new(
            "https://i.x/api/v1/media/3300/info/",
            200,
            r#"{"items":[{"code":"info1","pk":"3300"}],"status":"ok"}"#,
        );
        let report = interceptor().observe(&mut index, &exchange).unwrap();
        assert_eq!(report.stored, vec!["info1".to_string()]);
        assert_eq!(index.lookup_distribution_id("3300"), Some("info1"));
    }

    #[test]
    fn test_feed_items_unwrap_media() {
        let mut index = MediaIndex::new();
        let exchange = NetworkExchange::new(
            "https://i.x/api/v1/feed/reels_tray/",
            200,
            r#"{"items":[{"media":{"code":"feed1"}},{"code":"feed2"}]}"#,
        );
        interceptor().observe(&mut index, &exchange);
        assert!(index.contains("feed1"));
        assert!(index.contains("feed2"));
    }

    #[test]
    fn test_ingest_embedded_skips_bad_scripts() {
        let mut index = MediaIndex::new();
        let scripts = [
            r#"{"require":[{"shortcode":"emb1","video_view_count":7}]}"#,
            "not json",
        ];
        let report = interceptor().ingest_embedded(&mut index, scripts);
        assert_eq!(report.candidates, 1);
        assert_eq!(index.get("emb1").unwrap().engagement.play_count, Some(7));
    }
}
