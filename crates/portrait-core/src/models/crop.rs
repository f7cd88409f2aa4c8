use serde::{Deserialize, Serialize};

use crate::constants::{AVATAR_ASPECT_RATIO, INITIAL_CROP_WIDTH_RATIO, MAX_ZOOM, MIN_ZOOM};
use crate::error::AppError;

/// Tolerance for rectangles that touch the displayed edge after float math.
const EDGE_EPSILON: f64 = 1e-6;

/// Size of the image as it is displayed in the crop UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Crop rectangle in displayed-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// The region a user picked, as confirmed when they press "Apply".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub rect: CropRect,
    /// Dimensions of the preview the rectangle was drawn against.
    pub displayed: DisplaySize,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation_degrees: f64,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,
}

fn default_zoom() -> f64 {
    1.0
}

fn default_aspect_ratio() -> f64 {
    AVATAR_ASPECT_RATIO
}

/// Crop rectangle mapped onto the natural (full resolution) image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Pixel size of the output surface.
    pub output_width: u32,
    pub output_height: u32,
}

impl ScaledCrop {
    /// Center of the crop in natural-image coordinates.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl CropRegion {
    pub fn new(rect: CropRect, displayed: DisplaySize) -> Self {
        Self {
            rect,
            displayed,
            zoom: default_zoom(),
            rotation_degrees: 0.0,
            aspect_ratio: default_aspect_ratio(),
        }
    }

    /// Initial crop shown when an image loads: 90% of the displayed width at
    /// the target aspect ratio, shrunk to fit and centered.
    pub fn centered(displayed: DisplaySize, aspect_ratio: f64) -> Self {
        let mut width = displayed.width * INITIAL_CROP_WIDTH_RATIO;
        let mut height = width / aspect_ratio;
        if height > displayed.height {
            height = displayed.height * INITIAL_CROP_WIDTH_RATIO;
            width = height * aspect_ratio;
        }
        let rect = CropRect::new(
            (displayed.width - width) / 2.0,
            (displayed.height - height) / 2.0,
            width,
            height,
        );
        Self {
            aspect_ratio,
            ..Self::new(rect, displayed)
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Back to zoom 1, no rotation and a freshly centered rectangle.
    pub fn reset(&mut self) {
        *self = Self::centered(self.displayed, self.aspect_ratio);
    }

    /// True when zoom or rotation change how the source is sampled.
    pub fn has_transform(&self) -> bool {
        (self.zoom - 1.0).abs() > f64::EPSILON || self.rotation_degrees.rem_euclid(360.0) != 0.0
    }

    pub fn rotation_radians(&self) -> f64 {
        self.rotation_degrees.to_radians()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let values = [
            self.rect.x,
            self.rect.y,
            self.rect.width,
            self.rect.height,
            self.displayed.width,
            self.displayed.height,
            self.zoom,
            self.rotation_degrees,
            self.aspect_ratio,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AppError::InvalidCropRegion(
                "Crop values must be finite numbers".to_string(),
            ));
        }
        if self.displayed.width <= 0.0 || self.displayed.height <= 0.0 {
            return Err(AppError::InvalidCropRegion(format!(
                "Displayed size must be positive, got {}x{}",
                self.displayed.width, self.displayed.height
            )));
        }
        if self.rect.width <= 0.0 || self.rect.height <= 0.0 {
            return Err(AppError::InvalidCropRegion(format!(
                "Crop size must be positive, got {}x{}",
                self.rect.width, self.rect.height
            )));
        }
        if self.rect.x < 0.0
            || self.rect.y < 0.0
            || self.rect.x + self.rect.width > self.displayed.width + EDGE_EPSILON
            || self.rect.y + self.rect.height > self.displayed.height + EDGE_EPSILON
        {
            return Err(AppError::InvalidCropRegion(format!(
                "Crop ({}, {}, {}x{}) exceeds the displayed image ({}x{})",
                self.rect.x,
                self.rect.y,
                self.rect.width,
                self.rect.height,
                self.displayed.width,
                self.displayed.height
            )));
        }
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom) {
            return Err(AppError::InvalidCropRegion(format!(
                "Zoom must be between {} and {}, got {}",
                MIN_ZOOM, MAX_ZOOM, self.zoom
            )));
        }
        if self.aspect_ratio <= 0.0 {
            return Err(AppError::InvalidCropRegion(
                "Aspect ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Map the rectangle onto an image of the given natural size.
    pub fn scale_to(&self, natural_width: u32, natural_height: u32) -> ScaledCrop {
        let scale_x = natural_width as f64 / self.displayed.width;
        let scale_y = natural_height as f64 / self.displayed.height;
        let width = self.rect.width * scale_x;
        let height = self.rect.height * scale_y;
        ScaledCrop {
            x: self.rect.x * scale_x,
            y: self.rect.y * scale_y,
            width,
            height,
            output_width: (width.round() as u32).max(1),
            output_height: (height.round() as u32).max(1),
        }
    }
}
