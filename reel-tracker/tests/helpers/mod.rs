//! Test helper modules for reel-tracker integration tests
//!
//! - FakeDom: in-memory `PageDom` implementation
//! - payload builders for recorded-response shapes

#![allow(dead_code)]

pub mod fake_dom;

pub use fake_dom::FakeDom;

use serde_json::{json, Value};

use reel_common::{EventBus, TrackerConfig};
use reel_tracker::{NetworkExchange, PageSession};

pub const GRAPHQL_URL: &str = "https://www.example.com/graphql/query/";

/// Session with default thresholds and a small bus
pub fn new_session() -> PageSession {
    PageSession::new(TrackerConfig::default(), EventBus::new(64)).unwrap()
}

/// Successful structured-query response carrying `payload`
pub fn graphql(payload: Value) -> NetworkExchange {
    NetworkExchange::new(GRAPHQL_URL, 200, payload.to_string())
}

/// Timeline connection wrapping the given media objects
pub fn timeline(media: Vec<Value>) -> Value {
    let edges: Vec<Value> = media
        .into_iter()
        .map(|m| json!({"node": {"media": m}}))
        .collect();
    json!({"data": {"xdt_api__v1__feed__timeline__connection": {"edges": edges}}})
}

/// Playable media object with a creation time
pub fn video(code: &str, taken_at: i64) -> Value {
    json!({
        "code": code,
        "taken_at": taken_at,
        "like_count": 1,
        "video_versions": [{"url": format!("https://cdn.example.com/{code}.mp4")}]
    })
}
