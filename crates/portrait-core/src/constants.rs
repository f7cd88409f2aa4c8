//! Pipeline-wide constants.
//!
//! These bound the size and format of everything that crosses the upload
//! pipeline and are deliberately not part of [`crate::ClientConfig`].

/// Maximum accepted size of a selected image (5 MiB).
pub const MAX_IMAGE_SIZE_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted at selection time. `image/jpg` is accepted as an
/// alias of `image/jpeg`.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Content type of every buffer produced by the crop transform.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// File extension announced to the backend for the output buffer.
pub const OUTPUT_FILE_EXTENSION: &str = "jpg";

/// JPEG quality (0-100) used for the output buffer.
pub const OUTPUT_JPEG_QUALITY: u8 = 95;

/// Zoom range offered by the crop UI.
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// Share of the displayed width covered by the initial crop rectangle.
pub const INITIAL_CROP_WIDTH_RATIO: f64 = 0.9;

/// Aspect ratio used for avatars.
pub const AVATAR_ASPECT_RATIO: f64 = 1.0;

/// Display name used when a profile carries no name.
pub const DEFAULT_DISPLAY_NAME: &str = "HR Professional";
