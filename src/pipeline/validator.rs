// Upload validation.
// Runs before any decoding or segmentation work and short-circuits on the first
// failed check: size, then extension, then container structure.

use crate::config::Settings;
use image::ImageReader;
use std::io::Cursor;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

pub fn validate(settings: &Settings, data: &[u8], filename: &str) -> ValidationResult {
    if let Err(reason) = check_size(settings, data.len()) {
        return ValidationResult::Invalid(reason);
    }
    if let Err(reason) = check_extension(settings, filename) {
        return ValidationResult::Invalid(reason);
    }
    if let Err(reason) = check_structure(data) {
        return ValidationResult::Invalid(reason);
    }
    ValidationResult::Valid
}

fn check_size(settings: &Settings, len: usize) -> Result<(), String> {
    if len as u64 > settings.max_file_size_bytes() {
        return Err(format!(
            "File too large. Maximum size is {}MB, got {:.2}MB",
            settings.max_file_size_mb,
            len as f64 / BYTES_PER_MB
        ));
    }
    Ok(())
}

fn check_extension(settings: &Settings, filename: &str) -> Result<(), String> {
    let extension = file_extension(filename);
    if !settings
        .allowed_extensions
        .iter()
        .any(|allowed| *allowed == extension)
    {
        return Err(format!(
            "Invalid file type. Allowed types: {}",
            settings.allowed_extensions.join(", ")
        ));
    }
    Ok(())
}

/// Reads only the container header to prove the bytes are an image we can decode.
/// The parsed dimensions are discarded; pixel data is decoded later by the normalizer.
fn check_structure(data: &[u8]) -> Result<(), String> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())
        .and_then(|reader| reader.into_dimensions().map_err(|e| e.to_string()))
        .map(|_| ())
        .map_err(|e| format!("Invalid or corrupted image file: {}", e))
}

/// Lower-cased suffix starting at the last '.', or "" when there is none.
fn file_extension(filename: &str) -> String {
    filename
        .rfind('.')
        .map(|index| filename[index..].to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]))
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        buffer.into_inner()
    }

    fn reason(result: ValidationResult) -> String {
        match result {
            ValidationResult::Invalid(reason) => reason,
            ValidationResult::Valid => panic!("expected an invalid result"),
        }
    }

    #[test]
    fn test_valid_png_and_jpeg() {
        let settings = Settings::default();
        assert_eq!(
            validate(&settings, &png_bytes(8, 8), "cat.png"),
            ValidationResult::Valid
        );
        assert_eq!(
            validate(&settings, &jpeg_bytes(8, 8), "cat.JPEG"),
            ValidationResult::Valid
        );
        assert_eq!(
            validate(&settings, &jpeg_bytes(8, 8), "holiday.photo.Jpg"),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let settings = Settings {
            max_file_size_mb: 1,
            ..Settings::default()
        };

        // Exactly at the limit passes the size check and fails later on structure.
        let at_limit = vec![0u8; 1024 * 1024];
        let message = reason(validate(&settings, &at_limit, "a.png"));
        assert!(message.starts_with("Invalid or corrupted image file"));

        let over_limit = vec![0u8; 1024 * 1024 + 1];
        let message = reason(validate(&settings, &over_limit, "a.png"));
        assert!(message.starts_with("File too large"));
    }

    #[test]
    fn test_size_message_reports_limit_and_actual() {
        let settings = Settings::default();
        let data = vec![0u8; 6 * 1024 * 1024];
        assert_eq!(
            reason(validate(&settings, &data, "big.jpg")),
            "File too large. Maximum size is 5MB, got 6.00MB"
        );
    }

    #[test]
    fn test_size_checked_before_extension() {
        let settings = Settings::default();
        let data = vec![0u8; 6 * 1024 * 1024];
        assert!(reason(validate(&settings, &data, "big.gif")).contains("too large"));
    }

    #[test]
    fn test_disallowed_extension_lists_allowed_types() {
        let settings = Settings::default();
        let message = reason(validate(&settings, &png_bytes(4, 4), "anim.gif"));
        assert_eq!(message, "Invalid file type. Allowed types: .jpg, .jpeg, .png");
    }

    #[test]
    fn test_missing_extension_is_rejected() {
        let settings = Settings::default();
        let message = reason(validate(&settings, &png_bytes(4, 4), "photo"));
        assert!(message.starts_with("Invalid file type"));

        let message = reason(validate(&settings, &png_bytes(4, 4), ""));
        assert!(message.starts_with("Invalid file type"));
    }

    #[test]
    fn test_trailing_dot_is_rejected() {
        let settings = Settings::default();
        assert_ne!(
            validate(&settings, &png_bytes(4, 4), "photo."),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_garbage_bytes_fail_structure_check() {
        let settings = Settings::default();
        let message = reason(validate(&settings, b"definitely not an image", "fake.png"));
        assert!(message.starts_with("Invalid or corrupted image file: "));
        assert!(message.len() > "Invalid or corrupted image file: ".len());
    }

    #[test]
    fn test_empty_upload_fails_structure_check() {
        let settings = Settings::default();
        let message = reason(validate(&settings, &[], "empty.jpg"));
        assert!(message.starts_with("Invalid or corrupted image file"));
    }

    #[test]
    fn test_truncated_png_header_is_rejected() {
        let settings = Settings::default();
        let png = png_bytes(16, 16);
        assert_ne!(
            validate(&settings, &png[..12], "cut.png"),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.PNG"), ".png");
        assert_eq!(file_extension("archive.tar.Jpeg"), ".jpeg");
        assert_eq!(file_extension("photo"), "");
        assert_eq!(file_extension(".png"), ".png");
        assert_eq!(file_extension("ÄBC.Jpg"), ".jpg");
    }
}
