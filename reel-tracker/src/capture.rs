//! Captured network exchanges (JSON lines) for offline replay

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::intercept::NetworkExchange;

#[derive(Debug, Deserialize)]
struct CaptureLine {
    url: String,
    #[serde(default = "default_status")]
    status: u16,
    /// Raw body text, or the parsed JSON body
    body: Value,
}

fn default_status() -> u16 {
    200
}

impl From<CaptureLine> for NetworkExchange {
    fn from(line: CaptureLine) -> Self {
        let body = match line.body {
            Value::String(text) => text,
            other => other.to_string(),
        };
        NetworkExchange::new(line.url, line.status, body)
    }
}

/// Parse one exchange per line; blank lines and `#` comments are skipped
pub fn parse_capture(content: &str) -> Result<Vec<NetworkExchange>> {
    let mut exchanges = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parsed: CaptureLine = serde_json::from_str(line)
            .map_err(|e| Error::Capture(format!("line {}: {}", n + 1, e)))?;
        exchanges.push(parsed.into());
    }
    Ok(exchanges)
}

pub fn load_capture(path: &Path) -> Result<Vec<NetworkExchange>> {
    let content = std::fs::read_to_string(path)?;
    parse_capture(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capture_body_forms() {
        let content = r#"
# recorded session
{"url":"https://x/graphql/query","body":{"data":{"code":"a","like_count":1}}}
{"url":"https://x/api/v1/feed/timeline/","status":304,"body":"{\"items\":[]}"}
"#;
        let exchanges = parse_capture(content).unwrap();
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].status, 200);
        assert!(exchanges[0].body.contains("\"code\":\"a\""));
        assert_eq!(exchanges[1].status, 304);
        assert_eq!(exchanges[1].body, r#"{"items":[]}"#);
    }

    #[test]
    fn test_parse_capture_reports_line() {
        let err = parse_capture("{\"url\":\"a\",\"body\":null}\nnot json").unwrap_err();
        match err {
            Error::Capture(msg) => assert!(msg.starts_with("line 2:")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
