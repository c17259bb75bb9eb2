//! Recovers a [`Verdict`] from a provider response of unknown shape.
//!
//! The provider is asked for `{"result": ..., "confidence": ...}` but the
//! answer arrives wrapped in whatever envelope the API version uses, sometimes
//! surrounded by prose. Extraction runs an ordered list of
//! [`VerdictExtractor`]s and stops at the first hit; when none match the
//! verdict is [`Verdict::UNKNOWN`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::verdict::{RawVerdict, Verdict};

/// Top-level envelope fields known to carry model output, in priority order.
const KNOWN_FIELDS: [&str; 6] = [
    "predictions",
    "outputs",
    "results",
    "response",
    "output",
    "candidates",
];

/// Generic text-bearing fields of a list element, in priority order.
const TEXT_FIELDS: [&str; 3] = ["text", "content", "output"];

/// Inline `{...}` with a Real/Fake `result` followed by a numeric
/// `confidence`. Quotes may be backslash-escaped when the object sat inside a
/// JSON string.
static EMBEDDED_VERDICT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\{[^{}]*?\\*"result\\*"\s*:\s*\\*"(?:real|fake)[^"\\]*\\*"[^{}]*?\\*"confidence\\*"\s*:\s*[0-9.]+[^{}]*\}"#,
    )
    .expect("embedded verdict pattern is valid")
});

/// One way of finding a verdict in a response body.
pub trait VerdictExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_extract(&self, body: &Value) -> Option<RawVerdict>;
}

/// Looks inside well-known envelope fields, including the
/// `candidates[].content.parts[].text` shape of `generateContent`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KnownFields;

impl VerdictExtractor for KnownFields {
    fn name(&self) -> &'static str {
        "known_fields"
    }

    fn try_extract(&self, body: &Value) -> Option<RawVerdict> {
        let obj = body.as_object()?;
        KNOWN_FIELDS
            .iter()
            .filter_map(|field| obj.get(*field))
            .find_map(scan_field)
    }
}

fn scan_field(value: &Value) -> Option<RawVerdict> {
    match value {
        Value::Array(items) => items.iter().find_map(scan_element),
        Value::String(text) => verdict_from_text(text),
        _ => None,
    }
}

fn scan_element(item: &Value) -> Option<RawVerdict> {
    match item {
        Value::String(text) => verdict_from_text(text),
        Value::Object(obj) => scan_content_parts(obj).or_else(|| {
            TEXT_FIELDS
                .iter()
                .filter_map(|field| obj.get(*field))
                .find(|value| is_truthy(value))
                .and_then(Value::as_str)
                .and_then(verdict_from_text)
        }),
        _ => None,
    }
}

fn scan_content_parts(obj: &Map<String, Value>) -> Option<RawVerdict> {
    obj.get("content")?
        .get("parts")?
        .as_array()?
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .find_map(verdict_from_text)
}

/// Last resort: regex over the serialized body.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedJson;

impl VerdictExtractor for EmbeddedJson {
    fn name(&self) -> &'static str {
        "embedded_json"
    }

    fn try_extract(&self, body: &Value) -> Option<RawVerdict> {
        let serialized = serde_json::to_string(body).ok()?;
        let fragment = EMBEDDED_VERDICT.find(&serialized)?.as_str();
        let unescaped = fragment.replace("\\n", "").replace("\\\"", "\"");
        verdict_from_text(&unescaped)
    }
}

/// Runs extractors in order. Never fails.
pub struct ResponseNormalizer {
    extractors: Vec<Box<dyn VerdictExtractor>>,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(vec![Box::new(KnownFields), Box::new(EmbeddedJson)])
    }
}

impl ResponseNormalizer {
    pub fn new(extractors: Vec<Box<dyn VerdictExtractor>>) -> Self {
        Self { extractors }
    }

    pub fn normalize(&self, body: &Value) -> Verdict {
        for extractor in &self.extractors {
            if let Some(raw) = extractor.try_extract(body) {
                tracing::debug!(
                    extractor = extractor.name(),
                    result = %raw.result,
                    confidence = raw.confidence,
                    "verdict extracted"
                );
                return raw.into();
            }
        }
        tracing::warn!("provider response carried no recognizable verdict");
        Verdict::UNKNOWN
    }
}

/// Parses `text` as JSON, retrying on the span between the first `{` and the
/// last `}` when the model wrapped its answer in prose.
pub fn parse_lenient(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn verdict_from_text(text: &str) -> Option<RawVerdict> {
    raw_verdict(&parse_lenient(text)?)
}

fn raw_verdict(value: &Value) -> Option<RawVerdict> {
    let obj = value.as_object()?;
    let result = obj.get("result")?.as_str().filter(|r| !r.is_empty())?;
    Some(RawVerdict {
        result: result.to_string(),
        confidence: coerce_confidence(obj.get("confidence")),
    })
}

/// Numbers pass through, numeric strings are parsed, anything else is `0`.
fn coerce_confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
