//! Verdict types produced by response normalization.

use serde::{Deserialize, Serialize};

/// Canonical provider label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Real,
    Fake,
    Unknown,
}

impl Label {
    /// Maps free-form provider text onto a label. The first alphabetic word
    /// must be exactly `real` or `fake` (any case), so `"FAKE"` and
    /// `"Fake (manipulated)"` are [`Label::Fake`] but `"Realistic"` is not.
    pub fn from_provider_text(text: &str) -> Self {
        let first_word = text
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|word| !word.is_empty())
            .unwrap_or_default();
        if first_word.eq_ignore_ascii_case("real") {
            Label::Real
        } else if first_word.eq_ignore_ascii_case("fake") {
            Label::Fake
        } else {
            Label::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "Real",
            Label::Fake => "Fake",
            Label::Unknown => "Unknown",
        }
    }
}

/// `{result, confidence}` as the provider wrote it, before canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVerdict {
    pub result: String,
    pub confidence: f64,
}

/// Normalized answer for one media asset.
///
/// Confidence is on the 0–1 scale the prompt asks for. Values outside that
/// range are passed through as the provider sent them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    #[serde(rename = "result")]
    pub label: Label,
    pub confidence: f64,
}

impl Verdict {
    /// Safe default for an unparseable provider response.
    pub const UNKNOWN: Verdict = Verdict {
        label: Label::Unknown,
        confidence: 0.0,
    };
}

impl From<RawVerdict> for Verdict {
    fn from(raw: RawVerdict) -> Self {
        Verdict {
            label: Label::from_provider_text(&raw.result),
            confidence: raw.confidence,
        }
    }
}
