//! Fixed-format output encoding.
//!
//! Every cropped picture leaves the pipeline as a JPEG at
//! [`OUTPUT_JPEG_QUALITY`]; format and quality are not caller-configurable.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use portrait_core::constants::OUTPUT_JPEG_QUALITY;
use portrait_core::AppError;

/// Background used where the output has no opaque source pixel.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode an RGB surface as JPEG at the pipeline quality.
    pub fn encode_jpeg(img: &RgbImage) -> Result<Bytes, AppError> {
        let (width, height) = img.dimensions();
        let estimated_size = (width as usize * height as usize) / 4;
        let mut buffer = Vec::with_capacity(estimated_size);

        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, OUTPUT_JPEG_QUALITY);
        encoder
            .encode_image(img)
            .map_err(|e| AppError::Encode(e.to_string()))?;

        Ok(Bytes::from(buffer))
    }

    /// Drop the alpha channel by compositing onto [`BACKGROUND`].
    pub fn flatten(img: &DynamicImage) -> RgbImage {
        if !img.color().has_alpha() {
            return img.to_rgb8();
        }

        let rgba = img.to_rgba8();
        let (width, height) = img.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = a as u16;
            let blend = |c: u8, bg: u8| -> u8 {
                ((c as u16 * alpha + bg as u16 * (255 - alpha) + 127) / 255) as u8
            };
            Rgb([
                blend(r, BACKGROUND[0]),
                blend(g, BACKGROUND[1]),
                blend(b, BACKGROUND[2]),
            ])
        })
    }
}
