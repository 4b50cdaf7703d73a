use super::ProcessingError;
use image::{ColorType, ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a cut-out into an in-memory PNG, keeping the alpha channel.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ProcessingError> {
    let (width, height) = image.dimensions();
    debug!("Encoding {}x{} RGBA output as PNG.", width, height);

    let mut buffer = Cursor::new(Vec::new());
    image::write_buffer_with_format(
        &mut buffer,
        image.as_raw(),
        width,
        height,
        ColorType::Rgba8,
        ImageFormat::Png,
    )
    .map_err(ProcessingError::Encode)?;

    Ok(buffer.into_inner())
}
