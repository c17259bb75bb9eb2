//! Error taxonomy for a detection request.
//!
//! Every failure that can end a resolution cycle is a [`DetectionError`]. A
//! provider response that cannot be normalized is *not* an error; it degrades
//! to an unknown verdict inside the normalizer.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use super::prober::ProbeAttempt;

/// Errors that abort a detection request.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The provider credential is not configured. No network call was made.
    #[error("Gemini keys not configured on server")]
    Configuration,

    /// The uploaded media is neither an image nor a video.
    #[error("Unsupported file type: {mime}")]
    UnsupportedMedia {
        /// Declared or inferred MIME type, possibly empty.
        mime: String,
    },

    /// A candidate answered 401/403; probing stopped there.
    #[error("upstream rejected credential at {candidate} with status {status}")]
    UpstreamAuth {
        candidate: String,
        status: u16,
        /// Every attempt made, ending with the rejected one.
        attempts: Vec<ProbeAttempt>,
    },

    /// Every candidate failed softly, or the probe budget ran out first.
    #[error("All Gemini endpoints failed ({} attempts)", attempts.len())]
    UpstreamExhausted {
        attempts: Vec<ProbeAttempt>,
        /// `true` when remaining candidates were abandoned because the overall
        /// probe budget was spent.
        budget_exhausted: bool,
    },
}

impl ResponseError for DetectionError {
    fn status_code(&self) -> StatusCode {
        match self {
            DetectionError::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
            DetectionError::UnsupportedMedia { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DetectionError::UpstreamAuth { .. } | DetectionError::UpstreamExhausted { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            DetectionError::Configuration => json!({ "error": self.to_string() }),
            DetectionError::UnsupportedMedia { mime } => json!({
                "error": "Unsupported file type. Please upload an image (JPG/PNG) or a video (MP4, MOV, WEBM).",
                "mime": mime,
            }),
            DetectionError::UpstreamAuth {
                candidate,
                status,
                attempts,
            } => json!({
                "error": "Gemini proxy error",
                "candidate": candidate,
                "status": status,
                "details": attempts,
            }),
            DetectionError::UpstreamExhausted {
                attempts,
                budget_exhausted,
            } => json!({
                "error": "Gemini proxy error",
                "budget_exhausted": budget_exhausted,
                "details": attempts,
            }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
