//! Upload endpoint: one multipart file in, one detection outcome out.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures::TryStreamExt;
use serde_json::json;

use crate::detection::MediaAsset;
use crate::models::AppState;

/// Multipart field carrying the media.
pub const FILE_FIELD: &str = "file";

/// Classifies an uploaded image or video as real or fake.
///
/// # HTTP Method
/// `POST /api/detect`, `multipart/form-data` with a single `file` part.
///
/// # Success Response (200 OK)
/// ```json
/// {
///   "filename": "face.png",
///   "result": "Fake",
///   "confidence": 0.87,
///   "fileType": "image",
///   "thumbnail": null,
///   "raw": { "candidates": [] },
///   "id": 12,
///   "created_at": "2025-01-01T00:00:00Z"
/// }
/// ```
/// `id` and `created_at` are present only when the result was stored.
///
/// # Error Responses
/// - `400 Bad Request`: no `file` part
/// - `413 Payload Too Large`: file exceeds the upload limit
/// - `415 Unsupported Media Type`: neither an image nor a video
/// - `500 Internal Server Error`: provider credential not configured
/// - `502 Bad Gateway`: provider rejected the credential or every endpoint failed
#[tracing::instrument(skip_all)]
pub async fn detect(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, actix_web::Error> {
    // Fail before buffering the upload when there is nothing to call.
    state.detector.api_key()?;

    let mut upload = None;
    while let Some(field) = payload.try_next().await? {
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == FILE_FIELD);
        if !is_file || upload.is_some() {
            drain(field).await?;
            continue;
        }

        match read_file(field, state.max_upload_bytes).await? {
            Some(file) => upload = Some(file),
            None => {
                tracing::warn!(limit = state.max_upload_bytes, "upload exceeds limit");
                return Ok(HttpResponse::PayloadTooLarge().json(json!({
                    "error": format!("File too large (max {} bytes)", state.max_upload_bytes)
                })));
            }
        }
    }

    let Some((filename, mime, bytes)) = upload else {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "No file uploaded" })));
    };

    tracing::info!(%filename, size = bytes.len(), "upload received");
    let asset = MediaAsset::classify(filename, mime.as_deref(), bytes)?;
    let outcome = state.detect(&asset).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Reads the file part, or `None` once it grows past `limit`.
async fn read_file(
    mut field: Field,
    limit: usize,
) -> Result<Option<(String, Option<String>, Vec<u8>)>, actix_web::Error> {
    let filename = field
        .content_disposition()
        .and_then(|cd| cd.get_filename())
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_string();
    let mime = field.content_type().map(|m| m.essence_str().to_string());

    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if bytes.len() + chunk.len() > limit {
            return Ok(None);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(Some((filename, mime, bytes)))
}

async fn drain(mut field: Field) -> Result<(), actix_web::Error> {
    while field.try_next().await?.is_some() {}
    Ok(())
}
