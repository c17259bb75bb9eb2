//! Liveness endpoint.

use actix_web::{HttpResponse, Responder};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::{Duration, Instant};

static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Serialize)]
struct Health {
    status: &'static str,
    /// Human-readable time since server start.
    uptime: String,
}

/// Marks the process start; called once from `main`.
pub fn mark_start() {
    Lazy::force(&START_TIME);
}

/// `GET /api/health`
///
/// ```json
/// { "status": "ok", "uptime": "2h 14m 3s" }
/// ```
#[tracing::instrument]
pub async fn health_check() -> impl Responder {
    // Whole seconds keep the string short.
    let uptime = Duration::from_secs(START_TIME.elapsed().as_secs());
    HttpResponse::Ok().json(Health {
        status: "ok",
        uptime: humantime::format_duration(uptime).to_string(),
    })
}
