use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{debug, warn};

use super::error::ApiError;
use crate::config::Settings;

/// The `file` part of a multipart upload. Lives only for the duration of one request.
#[derive(Debug)]
pub struct UploadedImage {
    pub filename: String,
    pub data: Bytes,
}

pub async fn extract_uploaded_image(
    request: Request,
    settings: &Settings,
) -> Result<UploadedImage, ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart request: {}", e)))?;

    let mut upload: Option<UploadedImage> = None;
    let mut ignored_fields = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| field_error(e, settings))?
    {
        if field.name() == Some("file") {
            if upload.is_some() {
                warn!("Multiple 'file' fields found in multipart request, using the last one");
            }

            // A missing filename can't carry an extension, so validation rejects it.
            let filename = field.file_name().unwrap_or_default().to_string();
            debug!(
                "Receiving file '{}' with content type: {:?}",
                filename,
                field.content_type()
            );

            let data = field.bytes().await.map_err(|e| field_error(e, settings))?;
            upload = Some(UploadedImage { filename, data });
        } else {
            debug!(
                "Ignoring multipart field: {}",
                field.name().unwrap_or("unnamed")
            );
            ignored_fields += 1;
        }
    }

    if ignored_fields > 0 {
        debug!(
            "Ignored {} non-file fields in multipart request",
            ignored_fields
        );
    }

    upload.ok_or_else(|| {
        ApiError::BadRequest("Missing 'file' field in multipart request.".to_string())
    })
}

fn field_error(error: MultipartError, settings: &Settings) -> ApiError {
    // Oversized uploads are a validation failure, even when the transport cap catches them first.
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::Validation(format!(
            "File too large. Maximum size is {}MB",
            settings.max_file_size_mb
        ))
    } else {
        ApiError::BadRequest(format!("Failed to read multipart field: {}", error))
    }
}
