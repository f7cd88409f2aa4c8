//! Client-side image processing for profile pictures.
//!
//! - [`validator`]: the selection gate (content type allow-list, 5 MiB limit)
//! - [`crop`]: decode, crop/zoom/rotate against the displayed preview, encode
//! - [`compression`]: fixed-quality JPEG output
//! - [`traits`]: the decoder seam used by the crop transform

pub mod compression;
pub mod crop;
pub mod traits;
pub mod validator;

pub use compression::ImageCompressor;
pub use crop::{render_region, CropSession, CropTransform};
pub use traits::{ImageDecoder, RasterDecoder};
pub use validator::{content_type_for_path, ImageSelectionValidator, SelectedImage};
