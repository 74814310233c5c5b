//! Extraction of JSON from model output
//!
//! Models asked for strict JSON still occasionally wrap it in a fenced
//! code block or surround it with prose. The parser takes the first
//! ```` ```json ```` fence; when no parseable fence exists the raw text is
//! preserved under a `report` key rather than discarded.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};

fn fenced_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").ok())
        .as_ref()
}

/// Extract and parse the first ```` ```json ```` fenced block
#[must_use]
pub fn extract_fenced_json(message: &str) -> Option<Value> {
    let captures = fenced_regex()?.captures(message)?;
    let body = captures.get(1)?.as_str();
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "fenced block is not valid JSON");
            None
        }
    }
}

/// Parse model output into a JSON value, falling back to `{"report": text}`
#[must_use]
pub fn parse_model_json(text: &str) -> Value {
    extract_fenced_json(text).unwrap_or_else(|| json!({ "report": text }))
}
