// Segmenter backed by a native plugin loaded from a shared library.

use super::plugin_ffi::{self, BgrmErrorCode};
use super::{SegmentationError, Segmenter};
use image::{RgbImage, RgbaImage};
use libloading::Library;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

#[derive(Debug)]
pub enum PluginError {
    Load { path: PathBuf, source: libloading::Error },
    MissingSymbol { symbol: &'static str, source: libloading::Error },
    Initialize(BgrmErrorCode),
    InvalidInfo(String),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Load { path, source } => {
                write!(f, "Failed to load shared library from {:?}: {}", path, source)
            }
            PluginError::MissingSymbol { symbol, source } => {
                write!(f, "Failed to load symbol '{}': {}", symbol, source)
            }
            PluginError::Initialize(code) => {
                write!(f, "Plugin failed to initialize: {}", code)
            }
            PluginError::InvalidInfo(msg) => write!(f, "Invalid plugin info: {}", msg),
        }
    }
}

impl std::error::Error for PluginError {}

#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

pub struct PluginSegmenter {
    path: PathBuf,
    info: PluginInfo,
    shutdown_fn: plugin_ffi::ShutdownFn,
    segment_fn: plugin_ffi::SegmentFn,
    // Keeps the code behind the function pointers mapped.
    _lib: Library,
}

impl Drop for PluginSegmenter {
    fn drop(&mut self) {
        info!("Shutting down segmentation plugin: {}", self.info.name);
        unsafe { shutdown_plugin(self.shutdown_fn, &self.info.name) };
        debug!("Unloading plugin library {:?}", self.path);
    }
}

/// Resolve `name` (NUL-terminated) from `lib` and copy the function pointer out.
///
/// # Safety
/// `T` must match the exported symbol's real signature.
unsafe fn load_symbol<T: Copy>(
    lib: &Library,
    name: &'static [u8],
) -> Result<T, PluginError> {
    let symbol = unsafe { lib.get::<T>(name) }.map_err(|source| PluginError::MissingSymbol {
        symbol: std::str::from_utf8(&name[..name.len() - 1]).unwrap_or("<non-utf8>"),
        source,
    })?;
    Ok(*symbol)
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives the call.
unsafe fn c_str_to_string(ptr: *const c_char, field: &str) -> Result<String, PluginError> {
    if ptr.is_null() {
        return Err(PluginError::InvalidInfo(format!("{} is NULL", field)));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(String::from)
        .map_err(|e| PluginError::InvalidInfo(format!("{} is not UTF-8: {}", field, e)))
}

impl PluginSegmenter {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref().to_path_buf();

        // Loading a library runs its initializers; the plugin is trusted configuration.
        let lib = unsafe { Library::new(&path) }.map_err(|source| PluginError::Load {
            path: path.clone(),
            source,
        })?;

        let (initialize_fn, shutdown_fn, get_info_fn, segment_fn) = unsafe {
            (
                load_symbol::<plugin_ffi::InitializeFn>(&lib, b"bgrm_plugin_initialize\0")?,
                load_symbol::<plugin_ffi::ShutdownFn>(&lib, b"bgrm_plugin_shutdown\0")?,
                load_symbol::<plugin_ffi::GetInfoFn>(&lib, b"bgrm_plugin_get_info\0")?,
                load_symbol::<plugin_ffi::SegmentFn>(&lib, b"bgrm_plugin_segment\0")?,
            )
        };

        trace!("{:?}: Calling bgrm_plugin_initialize", path);
        let code = unsafe { initialize_fn() };
        if code != BgrmErrorCode::SUCCESS {
            return Err(PluginError::Initialize(code));
        }

        trace!("{:?}: Calling bgrm_plugin_get_info", path);
        let info = match unsafe { read_info(get_info_fn) } {
            Ok(info) => info,
            Err(err) => {
                unsafe { shutdown_plugin(shutdown_fn, &path.display().to_string()) };
                return Err(err);
            }
        };

        info!(
            "Loaded segmentation plugin '{}' v{} from {:?}",
            info.name, info.version, path
        );

        Ok(Self {
            path,
            info,
            shutdown_fn,
            segment_fn,
            _lib: lib,
        })
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }
}

/// # Safety
/// `get_info_fn` must come from an initialized plugin.
unsafe fn read_info(get_info_fn: plugin_ffi::GetInfoFn) -> Result<PluginInfo, PluginError> {
    let ptr = unsafe { get_info_fn() };
    if ptr.is_null() {
        return Err(PluginError::InvalidInfo(
            "bgrm_plugin_get_info returned NULL".to_string(),
        ));
    }
    let raw = unsafe { &*ptr };
    Ok(PluginInfo {
        name: unsafe { c_str_to_string(raw.name, "name") }?,
        version: unsafe { c_str_to_string(raw.version, "version") }?,
        description: unsafe { c_str_to_string(raw.description, "description") }?,
    })
}

impl Segmenter for PluginSegmenter {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn segment(&self, image: RgbImage) -> Result<RgbaImage, SegmentationError> {
        unsafe { run_segment(self.segment_fn, &self.info.name, image) }
    }
}

/// # Safety
/// `shutdown_fn` must come from a plugin that was initialized.
unsafe fn shutdown_plugin(shutdown_fn: plugin_ffi::ShutdownFn, name: &str) {
    let code = unsafe { shutdown_fn() };
    if code != BgrmErrorCode::SUCCESS {
        warn!("Plugin {} reported {} on shutdown", name, code);
    }
}

/// Hand `image` to the plugin and wrap the RGBA buffer it fills.
///
/// # Safety
/// `segment_fn` must come from an initialized plugin.
unsafe fn run_segment(
    segment_fn: plugin_ffi::SegmentFn,
    name: &str,
    image: RgbImage,
) -> Result<RgbaImage, SegmentationError> {
    let (width, height) = image.dimensions();
    let input = image.into_raw();
    let mut output = vec![0u8; width as usize * height as usize * 4];

    let code = unsafe {
        segment_fn(
            input.as_ptr(),
            input.len(),
            width,
            height,
            output.as_mut_ptr(),
            output.len(),
        )
    };
    if code != BgrmErrorCode::SUCCESS {
        return Err(SegmentationError::Failed {
            segmenter: name.to_string(),
            details: code.to_string(),
        });
    }

    RgbaImage::from_raw(width, height, output).ok_or_else(|| {
        SegmentationError::InvalidOutput(format!("buffer does not match {}x{} RGBA", width, height))
    })
}
