//! Sequential probing of candidate endpoints.
//!
//! Candidates are tried one at a time in order. The first 2xx answer wins and
//! nothing after it is contacted. A 401/403 stops the loop because the same
//! credential cannot succeed elsewhere; every other failure moves on to the
//! next candidate. The whole loop runs under an optional time budget.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::candidates::Candidate;
use super::error::DetectionError;

/// Status and decoded body of one provider response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

/// Sends one JSON request to one candidate. Implementations must not retry.
pub trait ProviderTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        api_key: &'a str,
        payload: &'a Value,
    ) -> impl Future<Output = Result<TransportResponse, String>> + Send + 'a;
}

/// `reqwest`-backed transport attaching the credential as both the
/// `x-goog-api-key` header and the `key` query parameter.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// # Errors
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(attempt_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(attempt_timeout).build()?;
        Ok(Self { client })
    }
}

impl ProviderTransport for HttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        api_key: &'a str,
        payload: &'a Value,
    ) -> impl Future<Output = Result<TransportResponse, String>> + Send + 'a {
        async move {
            let res = self
                .client
                .post(url)
                .header("x-goog-api-key", api_key)
                .query(&[("key", api_key)])
                .json(payload)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let status = res.status().as_u16();
            let text = res.text().await.map_err(|e| e.to_string())?;
            // Error pages are not always JSON; keep them as text for diagnostics.
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            Ok(TransportResponse { status, body })
        }
    }
}

/// What happened when one candidate was tried.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Success { body: Value },
    SoftFailure { status: u16, body: Value },
    HardFailure { status: u16, body: Value },
    TransportError { message: String },
}

impl ProbeOutcome {
    fn classify(response: TransportResponse) -> Self {
        match response.status {
            200..=299 => ProbeOutcome::Success {
                body: response.body,
            },
            401 | 403 => ProbeOutcome::HardFailure {
                status: response.status,
                body: response.body,
            },
            status => ProbeOutcome::SoftFailure {
                status,
                body: response.body,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeAttempt {
    pub candidate: Candidate,
    pub outcome: ProbeOutcome,
}

/// The single successful attempt of a resolution cycle.
#[derive(Debug, Clone)]
pub struct ProbeSuccess {
    pub candidate: Candidate,
    pub body: Value,
    /// Soft failures that preceded the success, in order.
    pub failures: Vec<ProbeAttempt>,
}

pub struct EndpointProber<'t, T> {
    transport: &'t T,
    budget: Option<Duration>,
}

impl<'t, T: ProviderTransport> EndpointProber<'t, T> {
    pub fn new(transport: &'t T, budget: Option<Duration>) -> Self {
        Self { transport, budget }
    }

    /// Tries `candidates` in order with the same `payload`.
    ///
    /// # Errors
    /// - [`DetectionError::UpstreamAuth`] on the first 401/403, carrying every
    ///   attempt up to and including it.
    /// - [`DetectionError::UpstreamExhausted`] when no candidate succeeded
    ///   before the list or the budget ran out.
    #[tracing::instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn probe(
        &self,
        candidates: &[Candidate],
        api_key: &str,
        payload: &Value,
    ) -> Result<ProbeSuccess, DetectionError> {
        let deadline = self.budget.map(|budget| Instant::now() + budget);
        let mut failures: Vec<ProbeAttempt> = Vec::new();

        for candidate in candidates {
            let remaining = remaining(deadline);
            if remaining.is_some_and(|r| r.is_zero()) {
                tracing::warn!(
                    attempted = failures.len(),
                    skipped = candidates.len() - failures.len(),
                    "probe budget exhausted before trying all candidates"
                );
                return Err(DetectionError::UpstreamExhausted {
                    attempts: failures,
                    budget_exhausted: true,
                });
            }

            let call = self.transport.post_json(candidate.url(), api_key, payload);
            let result = match remaining {
                Some(remaining) => match tokio::time::timeout(remaining, call).await {
                    Ok(result) => result,
                    Err(_) => Err(format!(
                        "probe budget of {} exhausted",
                        humantime::format_duration(self.budget.unwrap_or_default())
                    )),
                },
                None => call.await,
            };

            let outcome = match result {
                Ok(response) => ProbeOutcome::classify(response),
                Err(message) => ProbeOutcome::TransportError { message },
            };

            match outcome {
                ProbeOutcome::Success { body } => {
                    tracing::info!(candidate = %candidate, "provider endpoint answered");
                    return Ok(ProbeSuccess {
                        candidate: candidate.clone(),
                        body,
                        failures,
                    });
                }
                ProbeOutcome::HardFailure { status, body } => {
                    tracing::error!(
                        candidate = %candidate,
                        status,
                        "provider rejected credential, aborting probe"
                    );
                    failures.push(ProbeAttempt {
                        candidate: candidate.clone(),
                        outcome: ProbeOutcome::HardFailure { status, body },
                    });
                    return Err(DetectionError::UpstreamAuth {
                        candidate: candidate.to_string(),
                        status,
                        attempts: failures,
                    });
                }
                outcome => {
                    match &outcome {
                        ProbeOutcome::SoftFailure { status, .. } => {
                            tracing::warn!(candidate = %candidate, status, "candidate failed")
                        }
                        ProbeOutcome::TransportError { message } => {
                            tracing::warn!(candidate = %candidate, error = %message, "candidate unreachable")
                        }
                        _ => {}
                    }
                    failures.push(ProbeAttempt {
                        candidate: candidate.clone(),
                        outcome,
                    });
                }
            }
        }

        let budget_exhausted = is_expired(deadline);
        Err(DetectionError::UpstreamExhausted {
            attempts: failures,
            budget_exhausted,
        })
    }
}

fn remaining(deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
}

fn is_expired(deadline: Option<Instant>) -> bool {
    remaining(deadline).is_some_and(|remaining| remaining.is_zero())
}
