//! Final result assembly and the best-effort hand-off to persistence.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::media::{MediaAsset, MediaKind};
use super::verdict::Verdict;
use crate::models::NewDetectionRecord;
use crate::services::ResultStore;

/// What the caller gets back for one upload.
///
/// Serializes as
/// `{filename, result, confidence, fileType, thumbnail, raw, id?, created_at?}`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionOutcome {
    pub filename: String,
    #[serde(flatten)]
    pub verdict: Verdict,
    #[serde(rename = "fileType")]
    pub media_kind: MediaKind,
    /// Thumbnails are produced client-side; the field is kept for clients
    /// that read it.
    pub thumbnail: Option<String>,
    /// Provider response body, verbatim.
    pub raw: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Upper bound on a store write when none is configured.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OutcomeAssembler<'s, S> {
    store: Option<&'s S>,
    write_timeout: Duration,
}

impl<'s, S: ResultStore> OutcomeAssembler<'s, S> {
    /// `store` is `None` when results should not be written.
    pub fn new(store: Option<&'s S>) -> Self {
        Self {
            store,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }

    /// Builds the outcome, writing it to the store first when one is set. A
    /// failed or timed-out write is logged and the outcome is returned
    /// without `id`.
    pub async fn assemble(&self, asset: &MediaAsset, verdict: Verdict, raw: Value) -> DetectionOutcome {
        let mut stored = None;
        if let Some(store) = self.store {
            let record = NewDetectionRecord {
                file: asset.filename.clone(),
                result: verdict.label.as_str().to_string(),
                confidence: verdict.confidence,
            };
            match tokio::time::timeout(self.write_timeout, store.insert(&record)).await {
                Ok(Ok(row)) => {
                    tracing::info!(id = row.id, file = %row.file, "detection result stored");
                    stored = Some(row);
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, file = %asset.filename, "failed to store detection result");
                }
                Err(_) => {
                    tracing::warn!(
                        file = %asset.filename,
                        timeout = %humantime::format_duration(self.write_timeout),
                        "store write timed out, returning unstored result"
                    );
                }
            }
        }

        DetectionOutcome {
            filename: asset.filename.clone(),
            verdict,
            media_kind: asset.kind,
            thumbnail: None,
            raw,
            id: stored.as_ref().map(|row| row.id),
            created_at: stored.and_then(|row| row.created_at),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection::verdict::Label;
    use crate::models::DetectionRecord;
    use crate::services::StoreError;
    use serde_json::json;
    use std::future::Future;
    use std::sync::Mutex;

    /// In-memory store; `fail` makes every call error and `delay` stalls
    /// inserts.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub(crate) rows: Mutex<Vec<DetectionRecord>>,
        pub(crate) fail: bool,
        pub(crate) delay: Option<Duration>,
    }

    impl ResultStore for MemoryStore {
        fn insert<'a>(
            &'a self,
            record: &'a NewDetectionRecord,
        ) -> impl Future<Output = Result<DetectionRecord, StoreError>> + Send + 'a {
            async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                if self.fail {
                    return Err(StoreError::Decode("store offline".into()));
                }
                let mut rows = self.rows.lock().unwrap();
                let row = DetectionRecord {
                    id: rows.len() as i64 + 1,
                    file: record.file.clone(),
                    result: record.result.clone(),
                    confidence: record.confidence,
                    created_at: Some(Utc::now()),
                };
                rows.push(row.clone());
                Ok(row)
            }
        }

        fn recent(
            &self,
            limit: i64,
        ) -> impl Future<Output = Result<Vec<DetectionRecord>, StoreError>> + Send + '_ {
            async move {
                let rows = self.rows.lock().unwrap();
                Ok(rows.iter().rev().take(limit as usize).cloned().collect())
            }
        }

        fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send + '_ {
            async move {
                let mut rows = self.rows.lock().unwrap();
                let n = rows.len() as u64;
                rows.clear();
                Ok(n)
            }
        }
    }

    fn asset() -> MediaAsset {
        MediaAsset::classify("clip.mp4", Some("video/mp4"), vec![0; 4]).unwrap()
    }

    fn fake() -> Verdict {
        Verdict {
            label: Label::Fake,
            confidence: 0.8,
        }
    }

    #[tokio::test]
    async fn outcome_without_store_has_no_id() {
        let assembler = OutcomeAssembler::<MemoryStore>::new(None);
        let outcome = assembler.assemble(&asset(), fake(), json!({"raw": true})).await;

        assert_eq!(outcome.filename, "clip.mp4");
        assert_eq!(outcome.media_kind, MediaKind::Video);
        assert!(outcome.id.is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["result"], "Fake");
        assert_eq!(json["confidence"], 0.8);
        assert_eq!(json["fileType"], "video");
        assert_eq!(json["thumbnail"], Value::Null);
        assert_eq!(json["raw"], json!({"raw": true}));
        assert!(json.get("id").is_none());
    }

    #[tokio::test]
    async fn stored_outcome_carries_row_identity() {
        let store = MemoryStore::default();
        let outcome = OutcomeAssembler::new(Some(&store))
            .assemble(&asset(), fake(), json!({}))
            .await;

        assert_eq!(outcome.id, Some(1));
        assert!(outcome.created_at.is_some());
        let rows = store.rows.lock().unwrap();
        assert_eq!(rows[0].file, "clip.mp4");
        assert_eq!(rows[0].result, "Fake");
    }

    #[tokio::test]
    async fn store_failure_does_not_change_outcome() {
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let outcome = OutcomeAssembler::new(Some(&store))
            .assemble(&asset(), fake(), json!({"k": 1}))
            .await;

        assert_eq!(outcome.verdict, fake());
        assert_eq!(outcome.raw, json!({"k": 1}));
        assert!(outcome.id.is_none());
    }

    #[tokio::test]
    async fn slow_store_is_abandoned_after_timeout() {
        let store = MemoryStore {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        let started = std::time::Instant::now();
        let outcome = OutcomeAssembler::new(Some(&store))
            .with_write_timeout(Duration::from_millis(50))
            .assemble(&asset(), fake(), json!({"k": 1}))
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.verdict, fake());
        assert!(outcome.id.is_none());
        assert!(store.rows.lock().unwrap().is_empty());
    }
}
