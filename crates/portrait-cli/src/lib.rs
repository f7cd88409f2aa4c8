use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Args;
use portrait_core::constants::AVATAR_ASPECT_RATIO;
use portrait_core::models::{CropRect, CropRegion, DisplaySize, EncodedImage};
use portrait_core::{AppError, ErrorMetadata};
use portrait_processing::{content_type_for_path, CropTransform, ImageSelectionValidator};
use serde::Serialize;

/// Selection and crop options shared by `crop` and `upload`.
#[derive(Debug, Clone, Args)]
pub struct CropArgs {
    /// Image file (JPEG, PNG, GIF or WebP, at most 5MB)
    pub file: PathBuf,

    /// Declared content type; guessed from the file extension when omitted
    #[arg(long)]
    pub content_type: Option<String>,

    /// Crop rectangle as X,Y,WIDTH,HEIGHT in preview coordinates.
    /// Defaults to a centered square covering 90% of the preview
    #[arg(long, value_parser = parse_rect)]
    pub rect: Option<CropRect>,

    /// Size of the preview the rectangle was drawn on, as WIDTHxHEIGHT.
    /// Defaults to the image's own size
    #[arg(long, value_parser = parse_size)]
    pub display: Option<DisplaySize>,

    /// Zoom factor (0.5 to 3)
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f64,

    /// Clockwise rotation in degrees
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotate: f64,
}

impl CropArgs {
    /// Crop region for an image of the given natural size.
    pub fn region(&self, natural_size: (u32, u32)) -> CropRegion {
        let displayed = self.display.unwrap_or_else(|| {
            DisplaySize::new(natural_size.0 as f64, natural_size.1 as f64)
        });
        let region = match self.rect {
            Some(rect) => CropRegion::new(rect, displayed),
            None => CropRegion::centered(displayed, AVATAR_ASPECT_RATIO),
        };
        region.with_zoom(self.zoom).with_rotation(self.rotate)
    }

    pub fn content_type(&self) -> anyhow::Result<String> {
        match &self.content_type {
            Some(content_type) => Ok(content_type.clone()),
            None => content_type_for_path(&self.file)
                .map(str::to_string)
                .ok_or_else(|| {
                    anyhow!(
                        "Cannot tell the image type of {}; pass --content-type",
                        self.file.display()
                    )
                }),
        }
    }

    /// Validate, read, decode and crop the selected file.
    ///
    /// Type and size are checked from metadata before the file is read.
    pub async fn render(&self) -> anyhow::Result<EncodedImage> {
        let validator = ImageSelectionValidator::default();
        let content_type = validator
            .validate_content_type(&self.content_type()?)
            .map_err(|e| user_facing(e.into()))?;

        let metadata = tokio::fs::metadata(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        validator
            .validate_file_size(size)
            .map_err(|e| user_facing(e.into()))?;

        let data = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let selected = validator
            .select(data, &content_type)
            .map_err(|e| user_facing(e.into()))?;

        let session = CropTransform::new()
            .open(&selected)
            .await
            .map_err(user_facing)?;
        let region = self.region(session.natural_size());
        tracing::debug!(?region, "Cropping selection");

        session.render(&region).await.map_err(user_facing)
    }
}

/// Parse `X,Y,WIDTH,HEIGHT`.
pub fn parse_rect(value: &str) -> Result<CropRect, String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{}': {}", value, e))?;

    match parts.as_slice() {
        [x, y, width, height] => Ok(CropRect::new(*x, *y, *width, *height)),
        _ => Err(format!("expected X,Y,WIDTH,HEIGHT, got '{}'", value)),
    }
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(value: &str) -> Result<DisplaySize, String> {
    let (width, height) = value
        .split_once(|c| c == 'x' || c == 'X')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width = width
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid width '{}': {}", width, e))?;
    let height = height
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid height '{}': {}", height, e))?;
    Ok(DisplaySize::new(width, height))
}

/// Wrap a pipeline error with the message a user should see.
pub fn user_facing(err: AppError) -> anyhow::Error {
    let message = match err.suggested_action() {
        Some(action) => format!("{} ({})", err.client_message(), action),
        None => err.client_message(),
    };
    anyhow::Error::new(err).context(message)
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for the CLI.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
