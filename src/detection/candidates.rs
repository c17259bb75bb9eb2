//! Ordered, deduplicated list of provider endpoints to try for one request.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

const LATEST_SUFFIX: &str = "-latest";

/// One fully-qualified `generateContent` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds the probe order.
///
/// The override endpoint, when present, is always first. Then for each API
/// base (in order) every model is emitted, preferred model first, each
/// followed by its `-latest` variant unless it already carries that suffix.
/// Duplicates keep their first position.
pub fn generate_candidates(
    preferred_model: Option<&str>,
    fallback_models: &[String],
    api_bases: &[String],
    endpoint_override: Option<&str>,
) -> Vec<Candidate> {
    let models: Vec<&str> = preferred_model
        .into_iter()
        .chain(fallback_models.iter().map(String::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .collect();

    let mut urls = Vec::with_capacity(1 + api_bases.len() * models.len() * 2);
    if let Some(ep) = endpoint_override.map(str::trim).filter(|ep| !ep.is_empty()) {
        urls.push(ep.to_string());
    }

    for base in api_bases {
        let base = base.trim().trim_end_matches('/');
        for model in &models {
            urls.push(format!("{base}/models/{model}:generateContent"));
            if !model.ends_with(LATEST_SUFFIX) {
                urls.push(format!("{base}/models/{model}{LATEST_SUFFIX}:generateContent"));
            }
        }
    }

    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter()
        .filter(|url| seen.insert(url.clone()))
        .map(Candidate)
        .collect()
}
