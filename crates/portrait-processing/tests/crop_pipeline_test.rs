use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use portrait_core::constants::MAX_IMAGE_SIZE_BYTES;
use portrait_core::models::{CropRect, CropRegion, DisplaySize};
use portrait_core::{AppError, ValidationError};
use portrait_processing::{CropTransform, ImageDecoder, ImageSelectionValidator, RasterDecoder};

/// Decoder that counts how often it is reached.
#[derive(Default)]
struct SpyDecoder {
    calls: Arc<AtomicUsize>,
}

impl ImageDecoder for SpyDecoder {
    fn decode(&self, data: &[u8], content_type: &str) -> Result<DynamicImage, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RasterDecoder.decode(data, content_type)
    }
}

fn spy_transform() -> (CropTransform<SpyDecoder>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let transform = CropTransform::with_decoder(SpyDecoder {
        calls: Arc::clone(&calls),
    });
    (transform, calls)
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 255 / (width + height)) as u8,
        ])
    })
}

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn jpeg_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, 80)
        .encode_image(img)
        .unwrap();
    buffer
}

fn full_region(width: f64, height: f64) -> CropRegion {
    CropRegion::new(
        CropRect::new(0.0, 0.0, width, height),
        DisplaySize::new(width, height),
    )
}

#[tokio::test]
async fn test_rejected_type_never_reaches_decoder() {
    let (transform, calls) = spy_transform();
    let validator = ImageSelectionValidator::default();

    let err = transform
        .crop_selection(
            &validator,
            png_bytes(&gradient(10, 10)),
            "application/pdf",
            &full_region(10.0, 10.0),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidContentType { .. })
    ));
    assert!(err.is_validation());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_file_never_reaches_decoder() {
    let (transform, calls) = spy_transform();
    let validator = ImageSelectionValidator::default();

    let err = transform
        .crop_selection(
            &validator,
            vec![0u8; MAX_IMAGE_SIZE_BYTES + 1],
            "image/jpeg",
            &full_region(10.0, 10.0),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Validation(ValidationError::FileTooLarge { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_accepted_selection_decodes_once() {
    let (transform, calls) = spy_transform();
    let validator = ImageSelectionValidator::default();

    let encoded = transform
        .crop_selection(
            &validator,
            png_bytes(&gradient(64, 48)),
            "image/png",
            &full_region(32.0, 24.0),
        )
        .await
        .unwrap();

    assert_eq!((encoded.width, encoded.height), (64, 48));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_same_input_gives_identical_bytes() {
    let validator = ImageSelectionValidator::default();
    let selected = validator
        .select(png_bytes(&gradient(300, 200)), "image/png")
        .unwrap();
    let region = CropRegion::centered(DisplaySize::new(150.0, 100.0), 1.0)
        .with_zoom(1.75)
        .with_rotation(-30.0);

    let transform = CropTransform::new();
    let first = transform
        .produce_cropped_image(&selected, &region)
        .await
        .unwrap();
    let second = CropTransform::new()
        .produce_cropped_image(&selected, &region)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_large_photo_crops_to_natural_resolution() {
    let source = jpeg_bytes(&gradient(4000, 3000));
    assert!(source.len() <= MAX_IMAGE_SIZE_BYTES);

    let validator = ImageSelectionValidator::default();
    let region = CropRegion::new(
        CropRect::new(100.0, 100.0, 200.0, 200.0),
        DisplaySize::new(400.0, 300.0),
    );

    let encoded = CropTransform::new()
        .crop_selection(&validator, source, "image/jpeg", &region)
        .await
        .unwrap();

    assert_eq!((encoded.width, encoded.height), (2000, 2000));
    assert_eq!(encoded.content_type, "image/jpeg");
    assert_eq!(encoded.file_extension(), "jpg");

    let decoded = image::load_from_memory(&encoded.data).unwrap();
    assert_eq!(decoded.dimensions(), (2000, 2000));
}
