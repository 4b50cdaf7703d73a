// Image pipeline: validate -> normalize -> segment -> encode.
// Validation is run by the HTTP layer up front; everything after it lives in
// `BackgroundRemovalService` and reports failures as `ProcessingError`.

mod encoder;
mod normalizer;
mod validator;

pub use encoder::encode_png;
pub use normalizer::normalize;
pub use validator::{ValidationResult, validate};

use crate::config::Settings;
use crate::segmentation::{SegmentationError, Segmenter};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Failures after validation. All of them surface to clients as the same generic 500.
#[derive(Debug)]
pub enum ProcessingError {
    Decode(image::ImageError),
    Segmentation(SegmentationError),
    Encode(image::ImageError),
    TaskFailed(String),
}

impl ProcessingError {
    pub fn stage(&self) -> &'static str {
        match self {
            ProcessingError::Decode(_) => "decode",
            ProcessingError::Segmentation(_) => "segment",
            ProcessingError::Encode(_) => "encode",
            ProcessingError::TaskFailed(_) => "task",
        }
    }
}

impl fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingError::Decode(e) => write!(f, "{}", e),
            ProcessingError::Segmentation(e) => write!(f, "{}", e),
            ProcessingError::Encode(e) => write!(f, "{}", e),
            ProcessingError::TaskFailed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ProcessingError {}

impl From<SegmentationError> for ProcessingError {
    fn from(err: SegmentationError) -> Self {
        ProcessingError::Segmentation(err)
    }
}

pub struct BackgroundRemovalService {
    max_image_width: u32,
    segmenter: Arc<dyn Segmenter>,
}

impl BackgroundRemovalService {
    pub fn new(settings: &Settings, segmenter: Arc<dyn Segmenter>) -> Self {
        Self {
            max_image_width: settings.max_image_width,
            segmenter,
        }
    }

    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Turn a validated upload into PNG bytes with a transparent background.
    /// CPU-bound; call from a blocking context.
    pub fn remove_background(&self, data: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        let started = Instant::now();

        let image = normalize(data, self.max_image_width)?;
        debug!(
            "Normalized to {}x{} in {:?}",
            image.width(),
            image.height(),
            started.elapsed()
        );

        let segment_started = Instant::now();
        let cutout = self.segmenter.segment(image.into_rgb8())?;
        debug!(
            "Segmented with '{}' to {}x{} in {:?}",
            self.segmenter.name(),
            cutout.width(),
            cutout.height(),
            segment_started.elapsed()
        );

        let png = encode_png(&cutout)?;
        debug!(
            "Pipeline finished: {} bytes of PNG in {:?}",
            png.len(),
            started.elapsed()
        );
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::{OpaqueSegmenter, UnavailableSegmenter};
    use image::{GenericImageView, ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, image::Rgb([12, 200, 34]))
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn service(max_image_width: u32, segmenter: Arc<dyn Segmenter>) -> BackgroundRemovalService {
        let settings = Settings {
            max_image_width,
            ..Settings::default()
        };
        BackgroundRemovalService::new(&settings, segmenter)
    }

    #[test]
    fn test_output_is_png_with_alpha() {
        let service = service(1024, Arc::new(OpaqueSegmenter));
        let output = service.remove_background(&png_bytes(40, 30)).unwrap();

        let decoded = image::load_from_memory_with_format(&output, ImageFormat::Png).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
        assert!(decoded.color().has_alpha());
        assert!(decoded.to_rgba8().pixels().all(|p| p.0 == [12, 200, 34, 255]));
    }

    #[test]
    fn test_wide_input_is_bounded_before_segmentation() {
        let service = service(50, Arc::new(OpaqueSegmenter));
        let output = service.remove_background(&png_bytes(200, 80)).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (50, 20));
    }

    #[test]
    fn test_segmentation_failure_is_reported() {
        let service = service(1024, Arc::new(UnavailableSegmenter));
        let err = service.remove_background(&png_bytes(8, 8)).unwrap_err();
        assert_eq!(err.stage(), "segment");
        assert!(matches!(err, ProcessingError::Segmentation(_)));
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let service = service(1024, Arc::new(OpaqueSegmenter));
        let err = service.remove_background(b"\x89PNG\r\n\x1a\nbroken").unwrap_err();
        assert_eq!(err.stage(), "decode");
    }
}
