use serde::{Deserialize, Serialize};

/// Request for a signed write destination (phase 1 of an upload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Content type (MIME type) of the bytes that will be written
    pub content_type: String,
    /// Extension without the leading dot, e.g. "jpg"
    pub file_extension: String,
}

/// Signed write destination returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Short-lived URL accepting a single PUT of the image bytes
    pub signed_url: String,
    /// Storage path to hand back on confirmation
    pub file_path: String,
    /// URL the image will be served from once confirmed
    pub public_url: String,
    /// Content type the backend signed the URL for, when it normalizes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Confirmation of a finished transfer (phase 3 of an upload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmUploadRequest {
    pub file_path: String,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUsernameRequest {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUsernameResponse {
    pub username: String,
}
