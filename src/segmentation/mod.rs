// Foreground/background segmentation.
// The model itself is external; this module defines the seam the pipeline calls
// through and the backends that can sit behind it.

mod plugin;
mod plugin_ffi;
mod tract;

pub use plugin::PluginSegmenter;
pub use tract::TractSegmenter;

use image::{RgbImage, RgbaImage};
use std::fmt;

/// Turns an RGB bitmap into an RGBA cut-out whose background is transparent.
/// Implementations are shared across concurrent requests.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &str;

    fn segment(&self, image: RgbImage) -> Result<RgbaImage, SegmentationError>;
}

#[derive(Debug)]
pub enum SegmentationError {
    Unavailable(String),
    Failed { segmenter: String, details: String },
    InvalidOutput(String),
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationError::Unavailable(msg) => {
                write!(f, "Segmentation model unavailable: {}", msg)
            }
            SegmentationError::Failed { segmenter, details } => {
                write!(f, "Segmentation with '{}' failed: {}", segmenter, details)
            }
            SegmentationError::InvalidOutput(msg) => {
                write!(f, "Segmentation returned invalid output: {}", msg)
            }
        }
    }
}

impl std::error::Error for SegmentationError {}

/// Stands in when no plugin is configured. Every request fails as a processing error.
pub struct UnavailableSegmenter;

impl Segmenter for UnavailableSegmenter {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn segment(&self, _image: RgbImage) -> Result<RgbaImage, SegmentationError> {
        Err(SegmentationError::Unavailable(
            "no segmentation backend is loaded (set SEGMENTER_MODEL or SEGMENTER_PLUGIN)".to_string(),
        ))
    }
}

/// Keeps every pixel and marks it fully opaque.
#[cfg(test)]
pub struct OpaqueSegmenter;

#[cfg(test)]
impl Segmenter for OpaqueSegmenter {
    fn name(&self) -> &str {
        "opaque"
    }

    fn segment(&self, image: RgbImage) -> Result<RgbaImage, SegmentationError> {
        Ok(image::DynamicImage::ImageRgb8(image).into_rgba8())
    }
}
