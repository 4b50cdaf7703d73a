// Decodes uploads and bounds their width before segmentation.

use super::ProcessingError;
use image::{DynamicImage, GenericImageView, imageops::FilterType};

/// Decode `data` and downscale it to `max_width` if it is wider, keeping the aspect ratio.
/// Callers are expected to have validated the upload already.
pub fn normalize(data: &[u8], max_width: u32) -> Result<DynamicImage, ProcessingError> {
    let image = image::load_from_memory(data).map_err(ProcessingError::Decode)?;
    Ok(fit_to_width(image, max_width))
}

pub fn fit_to_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_width {
        return image;
    }

    // floor(height * max_width / width), in integers to avoid float rounding drift.
    let new_height = (u64::from(height) * u64::from(max_width) / u64::from(width)) as u32;
    let new_height = new_height.max(1);

    image.resize_exact(max_width, new_height, FilterType::Lanczos3)
}
