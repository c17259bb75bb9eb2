//! Persistence collaborator for detection results.
//!
//! Writes are best-effort from the detector's point of view: a failing store
//! is logged and never turns a computed outcome into an error.

use std::future::Future;

use thiserror::Error;

use super::{PgResultStore, SupabaseStore};
use crate::models::{DetectionRecord, NewDetectionRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unexpected store response: {0}")]
    Decode(String),
}

/// Row-oriented result store keyed by an identity column it manages itself.
pub trait ResultStore: Send + Sync {
    /// Inserts one row and returns it as stored.
    fn insert<'a>(
        &'a self,
        record: &'a NewDetectionRecord,
    ) -> impl Future<Output = Result<DetectionRecord, StoreError>> + Send + 'a;

    /// Newest rows first.
    fn recent(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<DetectionRecord>, StoreError>> + Send + '_;

    /// Removes every row, returning how many were deleted.
    fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send + '_;
}

/// The store selected by configuration.
#[derive(Debug, Clone)]
pub enum HistoryStore {
    Supabase(SupabaseStore),
    Postgres(PgResultStore),
}

impl ResultStore for HistoryStore {
    fn insert<'a>(
        &'a self,
        record: &'a NewDetectionRecord,
    ) -> impl Future<Output = Result<DetectionRecord, StoreError>> + Send + 'a {
        async move {
            match self {
                HistoryStore::Supabase(store) => store.insert(record).await,
                HistoryStore::Postgres(store) => store.insert(record).await,
            }
        }
    }

    fn recent(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<DetectionRecord>, StoreError>> + Send + '_ {
        async move {
            match self {
                HistoryStore::Supabase(store) => store.recent(limit).await,
                HistoryStore::Postgres(store) => store.recent(limit).await,
            }
        }
    }

    fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send + '_ {
        async move {
            match self {
                HistoryStore::Supabase(store) => store.clear().await,
                HistoryStore::Postgres(store) => store.clear().await,
            }
        }
    }
}
