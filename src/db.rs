//! Database connection utilities.
//!
//! Provides a function to create a connection pool to the Postgres database
//! backing the result history.

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

/// Establishes a connection pool to the Postgres database at `database_url`.
///
/// The pool is created lazily: no connection is opened until the first query,
/// so a database outage at startup does not keep the detector offline.
///
/// # Errors
/// Returns [`sqlx::Error`] if the URL cannot be parsed.
pub fn connect_pg_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
}
