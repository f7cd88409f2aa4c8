use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{OUTPUT_CONTENT_TYPE, OUTPUT_FILE_EXTENSION};

/// Durable record of an accepted profile picture, as owned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDescriptor {
    /// Opaque storage path; round-tripped verbatim, never built by the client.
    pub file_path: String,
    pub public_url: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Output of the crop transform, input of the upload orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Bytes,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// Wrap a JPEG buffer produced by the crop transform.
    pub fn jpeg(data: impl Into<Bytes>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            content_type: OUTPUT_CONTENT_TYPE.to_string(),
            width,
            height,
        }
    }

    /// File extension announced to the backend for this buffer.
    pub fn file_extension(&self) -> &'static str {
        extension_for_content_type(&self.content_type).unwrap_or(OUTPUT_FILE_EXTENSION)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Map an image content type to its canonical file extension.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}
