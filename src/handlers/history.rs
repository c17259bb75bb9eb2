//! Stored detection history.
//!
//! Both endpoints answer 501 when no store is configured, so clients can tell
//! "empty" from "unavailable".

use actix_web::{HttpResponse, web};
use serde_json::json;
use validator::Validate;

use crate::models::{AppState, HistoryQuery};
use crate::services::ResultStore;

fn not_configured() -> HttpResponse {
    HttpResponse::NotImplemented().json(json!({ "error": "Supabase not configured on server" }))
}

/// Lists stored results, newest first.
///
/// # HTTP Method
/// `GET /api/history?limit=50`
///
/// `limit` defaults to 200 and must lie in `1..=200`.
///
/// # Success Response (200 OK)
/// ```json
/// { "data": [ { "id": 3, "file": "clip.mp4", "result": "Real", "confidence": 0.91, "created_at": "..." } ] }
/// ```
#[tracing::instrument(skip(state))]
pub async fn get_history(
    state: web::Data<AppState>,
    query: web::Query<HistoryQuery>,
) -> HttpResponse {
    if let Err(e) = query.validate() {
        return HttpResponse::BadRequest().json(json!({ "error": e.to_string() }));
    }
    let Some(store) = state.store.as_ref() else {
        return not_configured();
    };

    match store.recent(query.limit()).await {
        Ok(data) => HttpResponse::Ok().json(json!({ "data": data })),
        Err(e) => {
            tracing::error!(error = %e, "history read failed");
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}

/// Deletes every stored result.
///
/// # HTTP Method
/// `DELETE /api/history`
///
/// # Success Response (200 OK)
/// ```json
/// { "deleted": true, "count": 17 }
/// ```
#[tracing::instrument(skip(state))]
pub async fn clear_history(state: web::Data<AppState>) -> HttpResponse {
    let Some(store) = state.store.as_ref() else {
        return not_configured();
    };

    match store.clear().await {
        Ok(count) => {
            tracing::info!(count, "history cleared");
            HttpResponse::Ok().json(json!({ "deleted": true, "count": count }))
        }
        Err(e) => {
            tracing::error!(error = %e, "history clear failed");
            HttpResponse::InternalServerError().json(json!({ "error": e.to_string() }))
        }
    }
}
