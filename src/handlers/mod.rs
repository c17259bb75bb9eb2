//! HTTP handlers and route registration.

pub mod detect;
pub mod health;
pub mod history;

use actix_web::{HttpResponse, error, web};
use serde_json::json;

pub use self::{
    detect::detect,
    health::health_check,
    history::{clear_history, get_history},
};

/// Registers every endpoint under `/api`.
///
/// # Example
/// ```rust,ignore
/// App::new()
///     .app_data(web::Data::new(state))
///     .configure(configure_routes);
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(query_config())
            .route("/detect", web::post().to(detect))
            .route("/history", web::get().to(get_history))
            .route("/history", web::delete().to(clear_history))
            .route("/health", web::get().to(health_check)),
    );
}

/// Malformed query strings get the same `{error}` body as handler-level
/// validation failures.
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let body = json!({ "error": err.to_string() });
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}
