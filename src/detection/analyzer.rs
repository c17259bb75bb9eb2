//! Deepfake detection through a remote generative model.
//!
//! [`Detector`] runs one resolution cycle per upload: build the candidate
//! list, probe it, normalize the answer and assemble the outcome.

use serde_json::Value;

use super::assembler::{DetectionOutcome, OutcomeAssembler};
use super::candidates::{Candidate, generate_candidates};
use super::error::DetectionError;
use super::media::MediaAsset;
use super::normalizer::ResponseNormalizer;
use super::prober::{EndpointProber, HttpTransport, ProviderTransport};
use super::verdict::Verdict;
use crate::config::DetectorConfig;
use crate::services::ResultStore;

/// Verdict plus the evidence it was derived from.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub verdict: Verdict,
    pub raw: Value,
    pub endpoint: Candidate,
}

pub struct Detector<T = HttpTransport> {
    config: DetectorConfig,
    transport: T,
    normalizer: ResponseNormalizer,
}

impl Detector<HttpTransport> {
    /// Detector talking to the provider over HTTP.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built.
    pub fn http(config: DetectorConfig) -> Result<Self, reqwest::Error> {
        let transport = HttpTransport::new(config.attempt_timeout)?;
        Ok(Self::new(config, transport))
    }
}

impl<T: ProviderTransport> Detector<T> {
    pub fn new(config: DetectorConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            normalizer: ResponseNormalizer::default(),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// The credential, or [`DetectionError::Configuration`] when unset.
    pub fn api_key(&self) -> Result<&str, DetectionError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(DetectionError::Configuration)
    }

    pub fn candidates(&self) -> Vec<Candidate> {
        generate_candidates(
            self.config.preferred_model.as_deref(),
            &self.config.fallback_models,
            &self.config.api_bases,
            self.config.endpoint_override.as_deref(),
        )
    }

    /// Finds an answering endpoint and normalizes its response.
    ///
    /// # Errors
    /// Configuration, authentication and exhaustion errors from
    /// [`DetectionError`]. An unparseable answer is not an error.
    #[tracing::instrument(skip_all, fields(filename = %asset.filename, mime = %asset.mime))]
    pub async fn resolve(&self, asset: &MediaAsset) -> Result<Resolution, DetectionError> {
        let api_key = self.api_key()?;
        let candidates = self.candidates();
        let payload = asset.provider_payload();

        let success = EndpointProber::new(&self.transport, self.config.probe_budget)
            .probe(&candidates, api_key, &payload)
            .await?;

        if !success.failures.is_empty() {
            tracing::info!(
                failed = success.failures.len(),
                endpoint = %success.candidate,
                "resolved after failed candidates"
            );
        }

        let verdict = self.normalizer.normalize(&success.body);
        Ok(Resolution {
            verdict,
            raw: success.body,
            endpoint: success.candidate,
        })
    }

    /// Full detection: resolve, then assemble the outcome and hand it to
    /// `store` if one is given.
    pub async fn detect<S: ResultStore>(
        &self,
        asset: &MediaAsset,
        store: Option<&S>,
    ) -> Result<DetectionOutcome, DetectionError> {
        let resolution = self.resolve(asset).await?;
        tracing::info!(
            endpoint = %resolution.endpoint,
            result = resolution.verdict.label.as_str(),
            confidence = resolution.verdict.confidence,
            "detection resolved"
        );
        Ok(OutcomeAssembler::new(store)
            .with_write_timeout(self.config.store_timeout)
            .assemble(asset, resolution.verdict, resolution.raw)
            .await)
    }
}
