//! Crop transform
//!
//! Maps a crop drawn on a (possibly scaled) preview back onto the full
//! resolution image, applies the zoom and rotation the user saw through the
//! crop window, and encodes the result as JPEG.

use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, GenericImageView, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use portrait_core::models::{CropRegion, EncodedImage, ScaledCrop};
use portrait_core::AppError;

use crate::compression::{ImageCompressor, BACKGROUND};
use crate::traits::{ImageDecoder, RasterDecoder};
use crate::validator::{ImageSelectionValidator, SelectedImage};

const GRID_EPSILON: f64 = 1e-6;

/// Entry point of the crop pipeline.
pub struct CropTransform<D = RasterDecoder> {
    decoder: Arc<D>,
}

impl CropTransform<RasterDecoder> {
    pub fn new() -> Self {
        Self::with_decoder(RasterDecoder)
    }
}

impl Default for CropTransform<RasterDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for CropTransform<D> {
    fn clone(&self) -> Self {
        Self {
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<D: ImageDecoder + 'static> CropTransform<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            decoder: Arc::new(decoder),
        }
    }

    /// Decode a selected image once so it can be cropped repeatedly.
    ///
    /// Decoding is CPU-bound and runs on the blocking pool.
    #[tracing::instrument(skip(self, image), fields(content_type = %image.content_type(), size_bytes = image.size()))]
    pub async fn open(&self, image: &SelectedImage) -> Result<CropSession, AppError> {
        let decoder = Arc::clone(&self.decoder);
        let data = image.data().clone();
        let content_type = image.content_type().to_string();

        let source = tokio::task::spawn_blocking(move || decoder.decode(&data, &content_type))
            .await
            .map_err(|e| AppError::Internal(format!("Decode task failed: {}", e)))??;

        let (width, height) = source.dimensions();
        tracing::debug!(width, height, "Decoded selected image");

        Ok(CropSession {
            source: Arc::new(source),
        })
    }

    /// Produce the final encoded buffer for a confirmed crop.
    pub async fn produce_cropped_image(
        &self,
        image: &SelectedImage,
        region: &CropRegion,
    ) -> Result<EncodedImage, AppError> {
        region.validate()?;
        let session = self.open(image).await?;
        session.render(region).await
    }

    /// Run the selection gate on raw bytes, then crop.
    ///
    /// Rejected selections never reach the decoder.
    pub async fn crop_selection(
        &self,
        validator: &ImageSelectionValidator,
        data: impl Into<Bytes>,
        content_type: &str,
        region: &CropRegion,
    ) -> Result<EncodedImage, AppError> {
        let selected = validator.select(data, content_type)?;
        self.produce_cropped_image(&selected, region).await
    }
}

/// A decoded image held for an interactive crop.
///
/// The decoded surface is released when the session is dropped.
#[derive(Clone)]
pub struct CropSession {
    source: Arc<DynamicImage>,
}

impl CropSession {
    /// Full resolution size of the decoded image.
    pub fn natural_size(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    pub async fn render(&self, region: &CropRegion) -> Result<EncodedImage, AppError> {
        region.validate()?;
        let source = Arc::clone(&self.source);
        let region = *region;

        tokio::task::spawn_blocking(move || render_region(&source, &region))
            .await
            .map_err(|e| AppError::Internal(format!("Crop task failed: {}", e)))?
    }
}

/// Crop, transform and encode synchronously.
pub fn render_region(source: &DynamicImage, region: &CropRegion) -> Result<EncodedImage, AppError> {
    let (natural_width, natural_height) = source.dimensions();
    let scaled = region.scale_to(natural_width, natural_height);

    let surface = match grid_aligned_rect(&scaled, natural_width, natural_height) {
        Some((x, y, width, height)) if !region.has_transform() => {
            ImageCompressor::flatten(&source.crop_imm(x, y, width, height))
        }
        _ => sample_transformed(&ImageCompressor::flatten(source), &scaled, region),
    };

    tracing::debug!(
        natural_width,
        natural_height,
        output_width = surface.width(),
        output_height = surface.height(),
        zoom = region.zoom,
        rotation_degrees = region.rotation_degrees,
        "Rendered crop"
    );

    let data = ImageCompressor::encode_jpeg(&surface)?;
    Ok(EncodedImage::jpeg(data, surface.width(), surface.height()))
}

/// The scaled rectangle as whole pixels, when it sits exactly on the pixel
/// grid inside the image.
fn grid_aligned_rect(scaled: &ScaledCrop, natural_width: u32, natural_height: u32) -> Option<(u32, u32, u32, u32)> {
    let values = [scaled.x, scaled.y, scaled.width, scaled.height];
    if values
        .iter()
        .any(|v| *v < 0.0 || (v - v.round()).abs() > GRID_EPSILON)
    {
        return None;
    }

    let [x, y, width, height] = values.map(|v| v.round() as u32);
    if width != scaled.output_width
        || height != scaled.output_height
        || x + width > natural_width
        || y + height > natural_height
    {
        return None;
    }
    Some((x, y, width, height))
}

/// Sample the source through the crop window with zoom and rotation applied
/// around the crop center.
fn sample_transformed(source: &RgbImage, scaled: &ScaledCrop, region: &CropRegion) -> RgbImage {
    let (center_x, center_y) = scaled.center();
    let out_width = scaled.output_width;
    let out_height = scaled.output_height;

    // Forward mapping, source -> output (applied right to left).
    let zoom = region.zoom as f32;
    let projection = Projection::translate(out_width as f32 / 2.0, out_height as f32 / 2.0)
        * Projection::rotate(region.rotation_radians() as f32)
        * Projection::scale(
            zoom * out_width as f32 / scaled.width as f32,
            zoom * out_height as f32 / scaled.height as f32,
        )
        * Projection::translate(-center_x as f32, -center_y as f32);

    let mut out = RgbImage::from_pixel(out_width, out_height, BACKGROUND);
    warp_into(source, &projection, Interpolation::Bicubic, BACKGROUND, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use portrait_core::models::{CropRect, DisplaySize};
    use std::io::Cursor;

    const RED: Rgb<u8> = Rgb([220, 20, 20]);
    const BLUE: Rgb<u8> = Rgb([20, 20, 220]);

    fn encode_png(img: &RgbImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn select(img: &RgbImage) -> SelectedImage {
        ImageSelectionValidator::default()
            .select(encode_png(img), "image/png")
            .unwrap()
    }

    fn region(x: f64, y: f64, w: f64, h: f64, dw: f64, dh: f64) -> CropRegion {
        CropRegion::new(CropRect::new(x, y, w, h), DisplaySize::new(dw, dh))
    }

    fn decode(encoded: &EncodedImage) -> RgbImage {
        image::load_from_memory(&encoded.data).unwrap().to_rgb8()
    }

    fn is_reddish(p: &Rgb<u8>) -> bool {
        p[0] > 150 && p[2] < 100
    }

    fn is_bluish(p: &Rgb<u8>) -> bool {
        p[2] > 150 && p[0] < 100
    }

    fn is_white(p: &Rgb<u8>) -> bool {
        p.0.iter().all(|c| *c > 230)
    }

    #[tokio::test]
    async fn test_output_matches_scaled_crop_for_each_scale_factor() {
        let transform = CropTransform::new();
        for scale in [0.5_f64, 1.0, 2.0, 10.0] {
            let natural = (100.0 * scale) as u32;
            let img = RgbImage::from_pixel(natural, natural, RED);
            let crop = region(10.0, 20.0, 40.0, 30.0, 100.0, 100.0);

            let encoded = transform
                .produce_cropped_image(&select(&img), &crop)
                .await
                .unwrap();

            let expected = ((40.0 * scale).round() as u32, (30.0 * scale).round() as u32);
            assert_eq!((encoded.width, encoded.height), expected, "scale {}", scale);
            assert_eq!(decode(&encoded).dimensions(), expected, "scale {}", scale);
            assert_eq!(encoded.content_type, "image/jpeg");
        }
    }

    #[tokio::test]
    async fn test_output_is_deterministic() {
        let img = RgbImage::from_fn(120, 90, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 90]));
        let selected = select(&img);
        let crop = region(5.5, 7.25, 30.0, 30.0, 60.0, 45.0)
            .with_zoom(1.3)
            .with_rotation(17.0);
        let transform = CropTransform::new();

        let first = transform.produce_cropped_image(&selected, &crop).await.unwrap();
        let second = transform.produce_cropped_image(&selected, &crop).await.unwrap();
        assert_eq!(first.data, second.data);
    }

    #[tokio::test]
    async fn test_direct_copy_samples_the_right_region() {
        // Left half red, right half blue; crop the right quarter.
        let img = RgbImage::from_fn(200, 100, |x, _| if x < 100 { RED } else { BLUE });
        let crop = region(75.0, 0.0, 25.0, 50.0, 100.0, 50.0);
        let encoded = CropTransform::new()
            .produce_cropped_image(&select(&img), &crop)
            .await
            .unwrap();

        let out = decode(&encoded);
        assert_eq!(out.dimensions(), (50, 100));
        assert!(out.pixels().all(is_bluish));
    }

    #[tokio::test]
    async fn test_rotation_is_applied_around_crop_center() {
        let img = RgbImage::from_fn(100, 100, |x, _| if x < 50 { RED } else { BLUE });
        let crop = region(0.0, 0.0, 100.0, 100.0, 100.0, 100.0).with_rotation(180.0);
        let encoded = CropTransform::new()
            .produce_cropped_image(&select(&img), &crop)
            .await
            .unwrap();

        let out = decode(&encoded);
        assert_eq!(out.dimensions(), (100, 100));
        assert!(is_bluish(out.get_pixel(10, 50)));
        assert!(is_reddish(out.get_pixel(90, 50)));
    }

    #[tokio::test]
    async fn test_zoom_in_magnifies_crop_center() {
        // Blue frame around a red center square covering 25..75.
        let img = RgbImage::from_fn(100, 100, |x, y| {
            if (25..75).contains(&x) && (25..75).contains(&y) {
                RED
            } else {
                BLUE
            }
        });
        let crop = region(0.0, 0.0, 100.0, 100.0, 100.0, 100.0).with_zoom(2.0);
        let out = decode(
            &CropTransform::new()
                .produce_cropped_image(&select(&img), &crop)
                .await
                .unwrap(),
        );
        assert!(is_reddish(out.get_pixel(5, 5)));
        assert!(is_reddish(out.get_pixel(94, 94)));
    }

    #[tokio::test]
    async fn test_zoom_out_fills_background() {
        let img = RgbImage::from_pixel(100, 100, BLUE);
        let crop = region(0.0, 0.0, 100.0, 100.0, 100.0, 100.0).with_zoom(0.5);
        let out = decode(
            &CropTransform::new()
                .produce_cropped_image(&select(&img), &crop)
                .await
                .unwrap(),
        );
        assert_eq!(out.dimensions(), (100, 100));
        assert!(is_white(out.get_pixel(2, 2)));
        assert!(is_bluish(out.get_pixel(50, 50)));
    }

    #[tokio::test]
    async fn test_session_renders_many_regions_from_one_decode() {
        let img = RgbImage::from_pixel(400, 300, RED);
        let session = CropTransform::new().open(&select(&img)).await.unwrap();
        assert_eq!(session.natural_size(), (400, 300));

        let mut crop = CropRegion::centered(DisplaySize::new(200.0, 150.0), 1.0);
        let first = session.render(&crop).await.unwrap();
        assert_eq!((first.width, first.height), (270, 270));

        crop = crop.with_zoom(2.5);
        let second = session.render(&crop).await.unwrap();
        assert_eq!((second.width, second.height), (270, 270));
    }

    #[tokio::test]
    async fn test_corrupt_bytes_fail_with_decode_error() {
        let selected = ImageSelectionValidator::default()
            .select(b"\x89PNG\r\n\x1a\nthis is not really a png".to_vec(), "image/png")
            .unwrap();
        let err = CropTransform::new()
            .produce_cropped_image(&selected, &region(0.0, 0.0, 1.0, 1.0, 1.0, 1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_invalid_region_is_rejected() {
        let img = RgbImage::from_pixel(10, 10, RED);
        let err = CropTransform::new()
            .produce_cropped_image(&select(&img), &region(5.0, 5.0, 10.0, 10.0, 10.0, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCropRegion(_)));
    }

    #[test]
    fn test_grid_alignment() {
        let aligned = region(10.0, 10.0, 20.0, 20.0, 100.0, 100.0).scale_to(200, 200);
        assert_eq!(grid_aligned_rect(&aligned, 200, 200), Some((20, 20, 40, 40)));

        let fractional = region(10.25, 10.0, 20.0, 20.0, 100.0, 100.0).scale_to(100, 100);
        assert_eq!(grid_aligned_rect(&fractional, 100, 100), None);
    }
}
