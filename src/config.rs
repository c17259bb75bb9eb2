//! Typed configuration read once at startup.
//!
//! Everything is resolved through a lookup function so the same parsing is
//! used for the real environment (`from_env`) and for tests (`from_lookup`)
//! without mutating process state.

use std::{env, time::Duration};

use thiserror::Error;

pub const DEFAULT_API_BASES: [&str; 2] = [
    "https://generativelanguage.googleapis.com/v1beta",
    "https://generativelanguage.googleapis.com/v1",
];

pub const DEFAULT_FALLBACK_MODELS: [&str; 4] = [
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro",
    "gemini-1.5-pro-latest",
];

const DEFAULT_PROBE_BUDGET: Duration = Duration::from_secs(90);
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_TABLE: &str = "file_results";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid duration: {source}")]
    InvalidDuration {
        var: &'static str,
        #[source]
        source: humantime::DurationError,
    },
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("invalid table name {0:?}; use letters, digits and underscores")]
    InvalidTable(String),
}

/// Inputs of one resolution cycle: credential, model preference and the
/// candidate space, plus timing limits.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Provider credential. Required at detect time, not at startup.
    pub api_key: Option<String>,
    pub preferred_model: Option<String>,
    pub fallback_models: Vec<String>,
    pub api_bases: Vec<String>,
    /// Tried before any generated candidate.
    pub endpoint_override: Option<String>,
    /// Overall limit for the whole candidate loop. `None` disables it.
    pub probe_budget: Option<Duration>,
    pub attempt_timeout: Duration,
    /// Limit for one result-store request. A detection whose write exceeds
    /// it is returned unstored.
    pub store_timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            preferred_model: None,
            fallback_models: DEFAULT_FALLBACK_MODELS.map(String::from).to_vec(),
            api_bases: DEFAULT_API_BASES.map(String::from).to_vec(),
            endpoint_override: None,
            probe_budget: Some(DEFAULT_PROBE_BUDGET),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl DetectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let probe_budget = match get("DETECT_PROBE_BUDGET").as_deref() {
            Some("0") | Some("off") | Some("none") => None,
            Some(raw) => Some(parse_duration("DETECT_PROBE_BUDGET", raw)?),
            None => defaults.probe_budget,
        };
        let attempt_timeout = get("DETECT_ATTEMPT_TIMEOUT")
            .map(|raw| parse_duration("DETECT_ATTEMPT_TIMEOUT", &raw))
            .transpose()?
            .unwrap_or(defaults.attempt_timeout);
        let store_timeout = get("STORE_TIMEOUT")
            .map(|raw| parse_duration("STORE_TIMEOUT", &raw))
            .transpose()?
            .unwrap_or(defaults.store_timeout);

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            preferred_model: get("GEMINI_MODEL"),
            fallback_models: get("GEMINI_FALLBACK_MODELS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.fallback_models),
            api_bases: get("GEMINI_API_BASES")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.api_bases),
            endpoint_override: get("GEMINI_API_ENDPOINT"),
            probe_budget,
            attempt_timeout,
            store_timeout,
        })
    }
}

/// Where detection results and history live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Supabase PostgREST endpoint.
    Supabase {
        url: String,
        key: String,
        table: String,
    },
    /// Direct Postgres connection.
    Postgres { database_url: String, table: String },
}

/// HTTP listener and persistence settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub store: Option<StoreConfig>,
    /// Write each detection to the store. History endpoints work regardless.
    pub persist_results: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "PORT",
                value: raw,
            })?,
            None => 4000,
        };
        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber {
                var: "MAX_UPLOAD_BYTES",
                value: raw,
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let table = get("SUPABASE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        validate_table(&table)?;

        let supabase_url = get("SUPABASE_URL").or_else(|| get("SUPABASE_HOST").map(|h| format!("https://{h}")));
        let supabase_key = get("SUPABASE_SERVICE_ROLE_KEY").or_else(|| get("SUPABASE_ANON_KEY"));
        let store = match (supabase_url, supabase_key, get("DATABASE_URL")) {
            (Some(url), Some(key), _) => Some(StoreConfig::Supabase {
                url: url.trim_end_matches('/').to_string(),
                key,
                table,
            }),
            (_, _, Some(database_url)) => Some(StoreConfig::Postgres {
                database_url,
                table,
            }),
            _ => None,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            max_upload_bytes,
            store,
            persist_results: get("SUPABASE_ENABLE").is_some_and(|v| v.eq_ignore_ascii_case("true")),
        })
    }
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn parse_duration(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|source| ConfigError::InvalidDuration { var, source })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Table names are interpolated into SQL and URLs, so only plain identifiers
/// are accepted.
pub fn validate_table(table: &str) -> Result<(), ConfigError> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTable(table.to_string()))
    }
}
