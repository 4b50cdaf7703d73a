// Rust definitions for the C segmentation plugin API.
//
// A plugin is a shared library exporting:
//
//   int32_t bgrm_plugin_initialize(void);
//   int32_t bgrm_plugin_shutdown(void);
//   const BgrmPluginInfo *bgrm_plugin_get_info(void);
//   int32_t bgrm_plugin_segment(const uint8_t *in_rgb, size_t in_size,
//                               uint32_t width, uint32_t height,
//                               uint8_t *out_rgba, size_t out_size);
//
// `bgrm_plugin_segment` receives tightly packed RGB8 rows and must fill the
// host-allocated RGBA8 buffer of the same dimensions. It may be called from
// several threads at once; plugins that need exclusive access lock internally.

use std::fmt;
use std::os::raw::c_char;

#[repr(C)]
#[derive(Debug)]
pub struct BgrmPluginInfo {
    pub name: *const c_char,
    pub version: *const c_char,
    pub description: *const c_char,
}

// Kept as a plain integer so unknown codes from a plugin can't produce an invalid enum.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BgrmErrorCode(pub i32);

impl BgrmErrorCode {
    pub const SUCCESS: Self = Self(0);
    pub const INVALID_ARGUMENT: Self = Self(1);
    pub const SEGMENTATION_FAILED: Self = Self(2);
    pub const OTHER: Self = Self(9999);
}

impl fmt::Display for BgrmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::SUCCESS => "success",
            Self::INVALID_ARGUMENT => "invalid argument",
            Self::SEGMENTATION_FAILED => "segmentation failed",
            Self::OTHER => "other error",
            _ => "unknown error",
        };
        write!(f, "{} (code {})", name, self.0)
    }
}

pub type InitializeFn = unsafe extern "C" fn() -> BgrmErrorCode;
pub type ShutdownFn = unsafe extern "C" fn() -> BgrmErrorCode;
pub type GetInfoFn = unsafe extern "C" fn() -> *const BgrmPluginInfo;
pub type SegmentFn = unsafe extern "C" fn(
    in_rgb: *const u8,
    in_size: usize,
    width: u32,
    height: u32,
    out_rgba: *mut u8,
    out_size: usize,
) -> BgrmErrorCode;
