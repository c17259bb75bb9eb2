//! Supabase result store over the PostgREST API.
//!
//! Rows are written to and read from `{url}/rest/v1/{table}` using the
//! service (or anon) key both as `apikey` and as bearer token. The table is
//! expected to have `id`, `file`, `result`, `confidence` and `created_at`
//! columns, with `id` and `created_at` filled in by the database.
//!
//! # Examples
//!
//! ```rust,no_run
//! use deepfake_server::{NewDetectionRecord, ResultStore, SupabaseStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let store = SupabaseStore::new("https://proj.supabase.co", "service-key", "file_results")?;
//! let row = store
//!     .insert(&NewDetectionRecord {
//!         file: "portrait.png".into(),
//!         result: "Fake".into(),
//!         confidence: 0.91,
//!     })
//!     .await?;
//! println!("stored as {}", row.id);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{ResultStore, StoreError};
use crate::config::{ConfigError, validate_table};
use crate::models::{DetectionRecord, NewDetectionRecord};

#[derive(Debug, Clone)]
pub struct SupabaseStore {
    client: Client,
    url: String,
    key: String,
    table: String,
}

impl SupabaseStore {
    /// # Errors
    /// [`ConfigError::InvalidTable`] when `table` is not a plain identifier.
    pub fn new(
        url: impl Into<String>,
        key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let table = table.into();
        validate_table(&table)?;
        Ok(Self {
            client: Client::new(),
            url: url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            table,
        })
    }

    /// Bounds every request made through this store.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, reqwest::Error> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.url, self.table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }
}

/// Maps a PostgREST response onto `T`, surfacing non-2xx bodies verbatim.
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, StoreError> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        return Err(StoreError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| StoreError::Decode(format!("{e} in {body}")))
}

impl ResultStore for SupabaseStore {
    fn insert<'a>(
        &'a self,
        record: &'a NewDetectionRecord,
    ) -> impl Future<Output = Result<DetectionRecord, StoreError>> + Send + 'a {
        async move {
            let res = self
                .authorized(self.client.post(self.endpoint()))
                .header("Prefer", "return=representation")
                .json(&[record])
                .send()
                .await?;
            let rows: Vec<DetectionRecord> = read_json(res).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| StoreError::Decode("insert returned no rows".to_string()))
        }
    }

    fn recent(
        &self,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<DetectionRecord>, StoreError>> + Send + '_ {
        async move {
            let res = self
                .authorized(self.client.get(self.endpoint()))
                .query(&[
                    ("select", "*".to_string()),
                    ("order", "created_at.desc".to_string()),
                    ("limit", limit.to_string()),
                ])
                .send()
                .await?;
            read_json(res).await
        }
    }

    fn clear(&self) -> impl Future<Output = Result<u64, StoreError>> + Send + '_ {
        async move {
            let res = self
                .authorized(self.client.delete(self.endpoint()))
                .header("Prefer", "return=representation")
                .query(&[("id", "neq.0")])
                .send()
                .await?;
            let rows: Vec<serde_json::Value> = read_json(res).await?;
            Ok(rows.len() as u64)
        }
    }
}
