//! Data models for stored detection results and shared application state.
//!
//! Records derive Serde and SQLx traits so the same type maps PostgREST JSON
//! and Postgres rows.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::{DetectorConfig, ServerConfig, StoreConfig};
use crate::db;
use crate::detection::{DetectionError, DetectionOutcome, Detector, MediaAsset};
use crate::services::{HistoryStore, PgResultStore, SupabaseStore};

/// Largest page the history endpoint returns.
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// A stored detection result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DetectionRecord {
    /// Identity column managed by the database
    pub id: i64,
    /// Original upload filename
    #[serde(default, deserialize_with = "null_as_default")]
    pub file: String,
    /// Canonical label ("Real", "Fake" or "Unknown")
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
    /// Provider confidence, nominally 0.0-1.0; `0` when the column is null
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Rows written by other clients may carry nulls; one such row must not
/// fail a whole history page.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row to insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize)]
pub struct NewDetectionRecord {
    pub file: String,
    pub result: String,
    pub confidence: f64,
}

/// Query parameters for `GET /api/history`.
#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl HistoryQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(MAX_HISTORY_LIMIT)
    }
}

/// Shared application state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    /// Result history, if any store is configured.
    pub store: Option<HistoryStore>,
    /// Whether successful detections are written to `store`.
    pub persist_results: bool,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Builds state from already-resolved configuration.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be built, the database URL is
    /// malformed, or the table name is invalid.
    pub fn new(detector: DetectorConfig, server: &ServerConfig) -> anyhow::Result<Self> {
        let store = match &server.store {
            Some(StoreConfig::Supabase { url, key, table }) => {
                let store = SupabaseStore::new(url, key, table)?
                    .with_timeout(detector.store_timeout)?;
                Some(HistoryStore::Supabase(store))
            }
            Some(StoreConfig::Postgres {
                database_url,
                table,
            }) => {
                let pool = db::connect_pg_pool(database_url)?;
                Some(HistoryStore::Postgres(PgResultStore::new(pool, table)?))
            }
            None => None,
        };

        Ok(Self {
            detector: Arc::new(Detector::http(detector)?),
            store,
            persist_results: server.persist_results,
            max_upload_bytes: server.max_upload_bytes,
        })
    }

    /// Reads configuration from the environment and builds state.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use deepfake_server::AppState;
    ///
    /// # fn run() -> anyhow::Result<()> {
    /// dotenv::dotenv().ok();
    /// let state = AppState::from_env()?;
    /// println!("history configured: {}", state.store.is_some());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_env() -> anyhow::Result<Self> {
        let server = ServerConfig::from_env()?;
        Self::new(DetectorConfig::from_env()?, &server)
    }

    /// Runs detection, writing the result when persistence is enabled.
    pub async fn detect(&self, asset: &MediaAsset) -> Result<DetectionOutcome, DetectionError> {
        let store = self.store.as_ref().filter(|_| self.persist_results);
        self.detector.detect(asset, store).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_defaults_and_validates() {
        let query = HistoryQuery { limit: None };
        assert_eq!(query.limit(), 200);
        assert!(query.validate().is_ok());

        assert!(HistoryQuery { limit: Some(0) }.validate().is_err());
        assert!(HistoryQuery { limit: Some(201) }.validate().is_err());
        assert!(HistoryQuery { limit: Some(50) }.validate().is_ok());
    }

    #[test]
    fn record_with_null_columns_decodes() {
        let row: DetectionRecord = serde_json::from_value(serde_json::json!({
            "id": 5,
            "file": null,
            "result": "Fake",
            "confidence": null,
            "created_at": "2024-05-01T10:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(row.id, 5);
        assert_eq!(row.file, "");
        assert_eq!(row.confidence, 0.0);

        let row: DetectionRecord = serde_json::from_value(serde_json::json!({ "id": 6 })).unwrap();
        assert_eq!(row.result, "");
        assert!(row.created_at.is_none());
    }

    #[test]
    fn state_without_store_builds() {
        let server = ServerConfig::from_lookup(|_| None).unwrap();
        let state = AppState::new(DetectorConfig::default(), &server).unwrap();
        assert!(state.store.is_none());
        assert!(!state.persist_results);
        assert!(state.detector.api_key().is_err());
    }
}
