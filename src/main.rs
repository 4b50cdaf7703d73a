// Main entry point for the bgremove-server application.
// Reads configuration, loads the segmentation backend, configures the Axum
// router and serves until a shutdown signal arrives.

mod config;
mod pipeline;
mod segmentation;
mod shutdown_signal;
mod web;

use clap::Parser;
use config::{AppConfig, Settings};
use segmentation::{PluginSegmenter, Segmenter, TractSegmenter, UnavailableSegmenter};
use shutdown_signal::shutdown_signal;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Parse command line args and environment variables
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let settings = Arc::new(Settings::from(&config));
    tracing::info!(
        "Starting {} v{} (max upload {}MB, max width {}px)",
        settings.api_title,
        settings.api_version,
        settings.max_file_size_mb,
        settings.max_image_width
    );

    // --- Load the segmentation backend ---
    let segmenter: Arc<dyn Segmenter> = match (&config.segmenter_model, &config.segmenter_plugin) {
        (Some(path), _) => match TractSegmenter::load(path) {
            Ok(model) => Arc::new(model),
            Err(err) => {
                tracing::error!("FATAL: Failed to load segmentation model: {}", err);
                eprintln!("FATAL: Segmentation model could not be loaded. See logs for details. Exiting.");
                std::process::exit(1);
            }
        },
        (None, Some(path)) => match PluginSegmenter::load(path) {
            Ok(plugin) => {
                tracing::info!("Segmentation plugin: {}", plugin.info().description);
                Arc::new(plugin)
            }
            Err(err) => {
                tracing::error!("FATAL: Failed to load segmentation plugin: {}", err);
                eprintln!("FATAL: Segmentation plugin could not be loaded. See logs for details. Exiting.");
                std::process::exit(1);
            }
        },
        (None, None) => {
            tracing::warn!(
                "No segmentation backend configured (SEGMENTER_MODEL or SEGMENTER_PLUGIN). \
                 The server will run but background removal requests will fail."
            );
            Arc::new(UnavailableSegmenter)
        }
    };

    let state = web::AppState::new(settings.clone(), segmenter);
    tracing::info!("Using segmenter '{}'", state.service.segmenter_name());

    let app = web::create_app(state);
    tracing::info!("Axum router configured.");

    // --- Start HTTP Server ---
    let listener = match web::create_listener(&settings.host, settings.port).await {
        Ok((addr, listener)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            listener
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            eprintln!("FATAL: Could not bind server. Error: {}. Exiting.", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        eprintln!("ERROR: Server shut down unexpectedly. Error: {}", e);
    }

    tracing::info!("bgremove-server has shut down.");
}
