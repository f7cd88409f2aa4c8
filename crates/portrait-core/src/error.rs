//! Error types module
//!
//! Every failure of the profile-picture pipeline is expressed as an
//! [`AppError`]. Selection-time problems are a separate [`ValidationError`]
//! so callers can tell "pick another file" apart from a decode or network
//! failure. Errors are `Clone` because a single in-flight upload may report
//! its outcome to several waiting callers.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a rejected transfer
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to the end user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSFER_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// Human-readable message suitable for a toast or banner
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Problems with the selected file, detected before any decode is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid content type: {content_type} (allowed: {allowed:?})")]
    InvalidContentType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("Empty file")]
    EmptyFile,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid crop region: {0}")]
    InvalidCropRegion(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Unauthorized: {0}")]
    Authentication(String),

    #[error("Backend request failed with status {status}: {message}")]
    Backend { status: u16, message: String },

    /// `status` is `None` when the storage endpoint could not be reached.
    #[error("Transfer to storage failed: {message}")]
    Transfer {
        status: Option<u16>,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidResponse(format!("JSON parsing error: {}", err))
    }
}

impl From<envy::Error> for AppError {
    fn from(err: envy::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Select a JPEG, PNG, GIF or WebP image smaller than 5MB"),
            LogLevel::Debug,
        ),
        AppError::Decode(_) => (
            "DECODE_ERROR",
            false,
            Some("Check image format and try a different file"),
            LogLevel::Warn,
        ),
        AppError::InvalidCropRegion(_) => (
            "INVALID_CROP_REGION",
            false,
            Some("Adjust the crop area and try again"),
            LogLevel::Debug,
        ),
        AppError::Encode(_) => (
            "ENCODE_ERROR",
            false,
            Some("Try a different image"),
            LogLevel::Error,
        ),
        AppError::Authentication(_) => (
            "AUTHENTICATION_ERROR",
            false,
            Some("Sign in again"),
            LogLevel::Debug,
        ),
        AppError::Backend { .. } => (
            "BACKEND_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Warn,
        ),
        AppError::Transfer { .. } => (
            "TRANSFER_ERROR",
            true,
            Some("Retry the upload"),
            LogLevel::Warn,
        ),
        AppError::Network(_) => (
            "NETWORK_ERROR",
            true,
            Some("Check your connection and retry"),
            LogLevel::Warn,
        ),
        AppError::InvalidResponse(_) => (
            "INVALID_RESPONSE",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
        AppError::Config(_) => (
            "CONFIG_ERROR",
            false,
            Some("Check the PORTRAIT_* environment variables"),
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Build a backend error from a non-success response body.
    ///
    /// The message is taken from a JSON `{"message": ...}` body when present,
    /// otherwise `fallback` is used.
    pub fn from_backend_response(status: u16, body: &str, fallback: &str) -> Self {
        AppError::Backend {
            status,
            message: message_from_body(body).unwrap_or_else(|| fallback.to_string()),
        }
    }

    /// True for failures of the selection gate.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Extract the `message` field from a JSON error body, if any.
pub fn message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation(ValidationError::FileTooLarge { .. }) => {
                "Please upload an image smaller than 5MB".to_string()
            }
            AppError::Validation(ValidationError::InvalidContentType { .. }) => {
                "Please upload an image file (JPEG, PNG, GIF, or WebP)".to_string()
            }
            AppError::Validation(ValidationError::EmptyFile) => {
                "The selected file is empty".to_string()
            }
            AppError::Decode(_) => "The selected image could not be read".to_string(),
            AppError::InvalidCropRegion(ref msg) => msg.clone(),
            AppError::Encode(_) => "Failed to prepare the cropped image".to_string(),
            AppError::Authentication(ref msg) => msg.clone(),
            AppError::Backend { ref message, .. } => message.clone(),
            AppError::Transfer { .. } => "Failed to upload the image to storage".to_string(),
            AppError::Network(_) => "Could not reach the server".to_string(),
            AppError::InvalidResponse(_) => "Unexpected response from the server".to_string(),
            AppError::Config(ref msg) => msg.clone(),
            AppError::Internal(_) => "Something went wrong".to_string(),
        }
    }
}
