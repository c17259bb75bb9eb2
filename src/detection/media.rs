//! Uploaded media classification and provider payload construction.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::DetectionError;

const IMAGE_PROMPT: &str = "You are a deepfake detection assistant. Analyze the uploaded image and determine if it is REAL or FAKE (AI-generated or manipulated). Respond ONLY with compact JSON: { \"result\": \"Real\" or \"Fake\", \"confidence\": 0.xx }. Do not include any other text.";

const VIDEO_PROMPT: &str = "You are a deepfake detection assistant. Analyze the uploaded video and determine if it is REAL or FAKE (AI-generated or manipulated). If possible, inspect motion artifacts, face/eye inconsistencies, frame blending, or other signs. Respond ONLY with compact JSON: { \"result\": \"Real\" or \"Fake\", \"confidence\": 0.xx }. Do not include any other text.";

/// Coarse media category accepted by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Instruction text sent alongside the media.
    pub fn prompt(self) -> &'static str {
        match self {
            MediaKind::Image => IMAGE_PROMPT,
            MediaKind::Video => VIDEO_PROMPT,
        }
    }
}

/// A single uploaded file, immutable once received.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub filename: String,
    /// Concrete MIME type sent to the provider, e.g. `image/png`.
    pub mime: String,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

impl MediaAsset {
    /// Classifies an upload from its declared content type, falling back to
    /// the filename extension when the client did not declare one.
    ///
    /// # Errors
    /// [`DetectionError::UnsupportedMedia`] when the result is neither an
    /// image nor a video.
    pub fn classify(
        filename: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, DetectionError> {
        let filename = filename.into();
        let mime = resolve_mime(declared_mime, &filename);
        let kind = if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            return Err(DetectionError::UnsupportedMedia { mime });
        };

        Ok(Self {
            filename,
            mime,
            kind,
            bytes,
        })
    }

    /// Builds the `generateContent` request body for this asset.
    pub fn provider_payload(&self) -> Value {
        json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [
                        { "text": self.kind.prompt() },
                        {
                            "inline_data": {
                                "mime_type": self.mime,
                                "data": BASE64.encode(&self.bytes),
                            }
                        }
                    ]
                }
            ]
        })
    }
}

/// Declared type wins unless it is missing or the generic octet-stream that
/// browsers send for unknown files.
fn resolve_mime(declared: Option<&str>, filename: &str) -> String {
    let declared = declared.map(str::trim).unwrap_or_default();
    if !declared.is_empty() && !declared.eq_ignore_ascii_case("application/octet-stream") {
        return declared.to_ascii_lowercase();
    }
    mime_from_extension(filename)
        .map(str::to_string)
        .unwrap_or_else(|| declared.to_string())
}

fn mime_from_extension(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let mime = match ext.to_ascii_lowercase().as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "m4v" => "video/x-m4v",
        "avi" => "video/x-msvideo",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime)
}
