//! Library entry point for the deepfake detection backend.
//!
//! Exports all core modules for use in integration tests and by the main binary.

pub mod config;
pub mod db;
pub mod detection;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::{ConfigError, DetectorConfig, ServerConfig, StoreConfig};
pub use detection::{DetectionError, DetectionOutcome, Detector, MediaAsset, MediaKind};
pub use logging::{get_subscriber, init_subscriber};
pub use middleware::RequestLoggingMiddleware;
pub use models::{AppState, DetectionRecord, HistoryQuery, NewDetectionRecord};
pub use services::{HistoryStore, PgResultStore, ResultStore, StoreError, SupabaseStore};
