//! Decoder seam for the crop transform.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader};
use portrait_core::AppError;

/// Turns selected bytes into a pixel surface.
///
/// Implementations are called from the blocking pool, never on the async
/// executor.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, data: &[u8], content_type: &str) -> Result<DynamicImage, AppError>;
}

/// Decoder backed by the `image` crate.
///
/// The format is sniffed from the magic bytes; the declared content type is
/// only used when sniffing is inconclusive.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterDecoder;

impl ImageDecoder for RasterDecoder {
    fn decode(&self, data: &[u8], content_type: &str) -> Result<DynamicImage, AppError> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| AppError::Decode(e.to_string()))?;

        if reader.format().is_none() {
            match ImageFormat::from_mime_type(content_type) {
                Some(format) => reader.set_format(format),
                None => {
                    return Err(AppError::Decode(format!(
                        "Unrecognized image data (declared as {})",
                        content_type
                    )))
                }
            }
        }

        reader.decode().map_err(|e| AppError::Decode(e.to_string()))
    }
}
