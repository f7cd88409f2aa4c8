use std::path::Path;

use bytes::Bytes;
use portrait_core::constants::{ALLOWED_CONTENT_TYPES, MAX_IMAGE_SIZE_BYTES};
use portrait_core::ValidationError;

/// A selected file that passed the selection gate.
///
/// Only [`ImageSelectionValidator::select`] can build one, so every value
/// that reaches the crop transform is within the size limit and of an
/// allowed type.
#[derive(Clone, Debug)]
pub struct SelectedImage {
    data: Bytes,
    content_type: String,
}

impl SelectedImage {
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Normalized content type (`image/jpg` is reported as `image/jpeg`).
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Selection gate for profile pictures
///
/// Checks size and declared content type before anything tries to decode
/// the bytes.
#[derive(Clone, Debug)]
pub struct ImageSelectionValidator {
    max_file_size: usize,
    allowed_content_types: Vec<String>,
}

impl Default for ImageSelectionValidator {
    fn default() -> Self {
        Self::new(
            MAX_IMAGE_SIZE_BYTES,
            ALLOWED_CONTENT_TYPES.iter().map(|ct| ct.to_string()).collect(),
        )
    }
}

impl ImageSelectionValidator {
    pub fn new(max_file_size: usize, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types,
        }
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type (case-insensitive, parameters ignored)
    pub fn validate_content_type(&self, content_type: &str) -> Result<String, ValidationError> {
        let normalized = normalize_content_type(content_type);

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct.eq_ignore_ascii_case(&normalized))
        {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(canonical_content_type(&normalized))
    }

    /// Run the gate and hand back a [`SelectedImage`].
    ///
    /// The content type is checked first so a wrong file type is reported as
    /// such even when the file is also too large.
    pub fn select(
        &self,
        data: impl Into<Bytes>,
        content_type: &str,
    ) -> Result<SelectedImage, ValidationError> {
        let data = data.into();
        let content_type = self.validate_content_type(content_type)?;
        self.validate_file_size(data.len())?;

        tracing::debug!(
            content_type = %content_type,
            size_bytes = data.len(),
            "Image selection accepted"
        );

        Ok(SelectedImage { data, content_type })
    }
}

/// Lowercase, trim and drop MIME parameters (`image/jpeg; q=1` → `image/jpeg`).
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn canonical_content_type(normalized: &str) -> String {
    match normalized {
        "image/jpg" => "image/jpeg".to_string(),
        other => other.to_string(),
    }
}

/// Guess the content type of a local file from its extension.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
