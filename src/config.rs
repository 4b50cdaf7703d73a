// Process-wide configuration.
// `AppConfig` is parsed once from the command line and environment, then frozen
// into a `Settings` value that is shared read-only by every request.

use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 5;
pub const DEFAULT_MAX_IMAGE_WIDTH: u32 = 1024;
pub const DEFAULT_API_TITLE: &str = "Background Remover API";
pub const DEFAULT_API_VERSION: &str = "1.0.0";
pub const DEFAULT_API_DESCRIPTION: &str = "Remove backgrounds from images using a pretrained \
    salient-object segmentation model. Upload a JPG or PNG image and receive a PNG with a \
    transparent background. Large images are downscaled before processing.";

/// Upload extensions accepted by the validator. Compared case-insensitively.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Command line arguments for bgremove-server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct AppConfig {
    /// Hostname/IP to bind the server to.
    /// "*" listens on all interfaces, IPv6 and IPv4 where the platform allows it.
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST, num_args = 0..=1, default_missing_value = "*")]
    pub host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Maximum accepted upload size, in megabytes.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = DEFAULT_MAX_FILE_SIZE_MB,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_file_size_mb: u64,

    /// Images wider than this are downscaled before segmentation.
    #[arg(long, env = "MAX_IMAGE_WIDTH", default_value_t = DEFAULT_MAX_IMAGE_WIDTH,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_image_width: u32,

    #[arg(long, env = "API_TITLE", default_value = DEFAULT_API_TITLE)]
    pub api_title: String,

    #[arg(long, env = "API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    #[arg(long, env = "API_DESCRIPTION", default_value = DEFAULT_API_DESCRIPTION)]
    pub api_description: String,

    /// U²-Net style ONNX model used to cut out the foreground.
    #[arg(long, env = "SEGMENTER_MODEL", conflicts_with = "segmenter_plugin")]
    pub segmenter_model: Option<PathBuf>,

    /// Shared library implementing the segmentation plugin API.
    #[arg(long, env = "SEGMENTER_PLUGIN")]
    pub segmenter_plugin: Option<PathBuf>,

    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,
}

/// Read-only settings threaded into the pipeline and the HTTP layer.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub max_file_size_mb: u64,
    pub max_image_width: u32,
    pub api_title: String,
    pub api_version: String,
    pub api_description: String,
    pub allowed_extensions: &'static [&'static str],
}

impl Settings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * BYTES_PER_MB
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            max_image_width: DEFAULT_MAX_IMAGE_WIDTH,
            api_title: DEFAULT_API_TITLE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            api_description: DEFAULT_API_DESCRIPTION.to_string(),
            allowed_extensions: ALLOWED_EXTENSIONS,
        }
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            max_file_size_mb: config.max_file_size_mb,
            max_image_width: config.max_image_width,
            api_title: config.api_title.clone(),
            api_version: config.api_version.clone(),
            api_description: config.api_description.clone(),
            allowed_extensions: ALLOWED_EXTENSIONS,
        }
    }
}
