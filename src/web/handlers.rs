// API handlers for the web server

use super::{
    AppState,
    error::ApiError,
    extract_request_data::extract_uploaded_image,
    models::*,
};
use crate::pipeline::{ProcessingError, ValidationResult, validate};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use axum_extra::TypedHeader;
use headers::ContentType;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const HEALTH_PATH: &str = "/api/health";
pub const REMOVE_BG_PATH: &str = "/api/remove-bg";
pub const DOCS_PATH: &str = "/docs";

// --- POST /api/remove-bg ---
// Validates the uploaded image, strips its background and returns a PNG attachment
pub async fn remove_background(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let upload = extract_uploaded_image(request, &state.settings).await?;

    info!(
        "Remove-background request: request_id={}, filename={:?}, size={}",
        request_id,
        upload.filename,
        upload.data.len()
    );

    if let ValidationResult::Invalid(reason) =
        validate(&state.settings, &upload.data, &upload.filename)
    {
        warn!("Rejected upload: request_id={}, reason={}", request_id, reason);
        return Err(ApiError::Validation(reason));
    }

    let service = state.service.clone();
    let data = upload.data;
    let png = tokio::task::spawn_blocking(move || service.remove_background(&data))
        .await
        .map_err(|e| ProcessingError::TaskFailed(format!("Image processing task failed: {}", e)))?
        .inspect_err(|e| {
            error!(
                "Processing failed: request_id={}, stage={}, error={}",
                request_id,
                e.stage(),
                e
            )
        })?;

    info!(
        "Remove-background completed: request_id={}, output_size={}",
        request_id,
        png.len()
    );

    Ok((
        TypedHeader(ContentType::from(mime::IMAGE_PNG)),
        [(header::CONTENT_DISPOSITION, content_disposition(&upload.filename))],
        png,
    )
        .into_response())
}

// --- GET /api/health ---
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: format!("{} is running", state.settings.api_title),
        version: state.settings.api_version.clone(),
    })
}

// --- GET / ---
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Welcome to {}", state.settings.api_title),
        version: state.settings.api_version.clone(),
        docs: DOCS_PATH,
        health: HEALTH_PATH,
        endpoints: EndpointMap {
            remove_background: "POST /api/remove-bg",
        },
    })
}

// --- GET /docs ---
pub async fn docs(State(state): State<AppState>) -> Json<ApiDocs> {
    let settings = &state.settings;
    Json(ApiDocs {
        title: settings.api_title.clone(),
        version: settings.api_version.clone(),
        description: settings.api_description.clone(),
        endpoints: vec![
            EndpointDoc {
                method: "POST",
                path: REMOVE_BG_PATH,
                summary: "Remove background from image",
                description: format!(
                    "Upload an image as multipart field 'file' and get back a PNG with a \
                     transparent background. Accepted formats: {}. Max file size: {}MB.",
                    settings.allowed_extensions.join(", "),
                    settings.max_file_size_mb
                ),
            },
            EndpointDoc {
                method: "GET",
                path: HEALTH_PATH,
                summary: "Health check",
                description: "Check if the API is running properly".to_string(),
            },
            EndpointDoc {
                method: "GET",
                path: "/",
                summary: "API information",
                description: "Basic API metadata and a map of available endpoints".to_string(),
            },
        ],
    })
}

/// Filename without its last extension segment.
fn file_stem(filename: &str) -> &str {
    filename
        .rsplit_once('.')
        .map_or(filename, |(stem, _)| stem)
}

fn content_disposition(filename: &str) -> HeaderValue {
    let stem: String = file_stem(filename)
        .chars()
        .map(|c| if (' '..='~').contains(&c) && c != '"' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=no_bg_{}.png", stem))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=no_bg_image.png"))
}
