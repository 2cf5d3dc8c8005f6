//! C ABI — lets the host editor process drive [`LipsyncNode`] directly.
//!
//! Functions are `#[no_mangle] extern "C"` so the host can bind them with
//! `ctypes`/`cffi` or any other C FFI without a wrapper library.
//!
//! ## Memory contract
//!
//! | Function                                  | Caller frees with              |
//! |-------------------------------------------|--------------------------------|
//! | [`latentsync_node_new`]                   | [`latentsync_node_free`]       |
//! | [`latentsync_node_schema`]                | [`latentsync_free_string`]     |
//! | `*out_path` of the two `generate` calls   | [`latentsync_free_string`]     |
//! | error return of the two `generate` calls  | [`latentsync_free_string`]     |

use std::ffi::{c_char, CStr, CString};
use std::path::PathBuf;

use crate::audio::Waveform;
use crate::backend::CommandBackend;
use crate::config::NodeConfig;
use crate::host::{FixedTempDir, HostEnvironment, SystemTemp};
use crate::node::{GenerationParams, LipsyncNode};
use crate::schema::NodeSchema;

/// Temp directory chosen at handle creation.
enum HostTemp {
    System(SystemTemp),
    Fixed(FixedTempDir),
}

impl HostEnvironment for HostTemp {
    fn temp_directory(&self) -> PathBuf {
        match self {
            HostTemp::System(h) => h.temp_directory(),
            HostTemp::Fixed(h) => h.temp_directory(),
        }
    }
}

/// Opaque handle to a configured lip-sync node.
pub struct LatentSyncHandle {
    node: LipsyncNode<CommandBackend, HostTemp>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Copy a C string into an owned `String`; `None` for null.
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Heap-allocate a C string. Interior nul bytes are replaced.
fn to_c_str(s: &str) -> *const c_char {
    let cleaned = s.replace('\0', "\u{FFFD}");
    match CString::new(cleaned) {
        Ok(cs) => cs.into_raw(),
        Err(_) => std::ptr::null(),
    }
}

/// Store a successful result in `out_path` and return the "no error" value.
unsafe fn finish(
    result: crate::error::Result<PathBuf>,
    out_path: *mut *const c_char,
) -> *const c_char {
    match result {
        Ok(path) => {
            if !out_path.is_null() {
                unsafe { *out_path = to_c_str(&path.to_string_lossy()) };
            }
            std::ptr::null()
        }
        Err(e) => to_c_str(&e.to_string()),
    }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Create a node for a LatentSync installation.
///
/// @param install_dir    UTF-8 path to the LatentSync checkout.
/// @param settings_json  Optional UTF-8 path to a node settings JSON file
///                       (`NULL` for defaults). `install_dir` wins over the
///                       file's `install_dir`.
/// @param temp_dir       Host temp directory, or `NULL` for the system one.
/// @return               Handle, or `NULL` on failure (details logged).
#[no_mangle]
pub unsafe extern "C" fn latentsync_node_new(
    install_dir: *const c_char,
    settings_json: *const c_char,
    temp_dir: *const c_char,
) -> *mut LatentSyncHandle {
    let Some(install_dir) = (unsafe { cstr_to_string(install_dir) }) else {
        tracing::error!("latentsync_node_new: null install_dir");
        return std::ptr::null_mut();
    };

    let mut config = match unsafe { cstr_to_string(settings_json) } {
        Some(path) => match NodeConfig::from_json_file(std::path::Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("latentsync_node_new: {}", e);
                return std::ptr::null_mut();
            }
        },
        None => NodeConfig::default(),
    };
    config.install_dir = PathBuf::from(install_dir);

    let host = match unsafe { cstr_to_string(temp_dir) } {
        Some(dir) => HostTemp::Fixed(FixedTempDir(PathBuf::from(dir))),
        None => HostTemp::System(SystemTemp),
    };
    let backend = CommandBackend::from_config(&config);

    Box::into_raw(Box::new(LatentSyncHandle {
        node: LipsyncNode::new(config, backend, host),
    }))
}

/// Return the node schema as JSON.
///
/// @return  Heap-allocated UTF-8 JSON, free with [`latentsync_free_string`].
#[no_mangle]
pub extern "C" fn latentsync_node_schema() -> *const c_char {
    match NodeSchema::lipsync().to_json() {
        Ok(json) => to_c_str(&json),
        Err(_) => std::ptr::null(),
    }
}

/// Path variant: lip-sync `video_path` to the audio file at `audio_path`.
///
/// @param out_path  Receives the output video path on success.
/// @return          `NULL` on success, otherwise an error message.
#[no_mangle]
pub unsafe extern "C" fn latentsync_generate(
    node: *mut LatentSyncHandle,
    video_path: *const c_char,
    audio_path: *const c_char,
    inference_steps: u32,
    guidance_scale: f32,
    seed: i64,
    out_path: *mut *const c_char,
) -> *const c_char {
    if node.is_null() {
        return to_c_str("null node handle");
    }
    let h = unsafe { &mut *node };
    let video = unsafe { cstr_to_string(video_path) }.unwrap_or_default();
    let audio = unsafe { cstr_to_string(audio_path) }.unwrap_or_default();
    let params = GenerationParams {
        inference_steps,
        guidance_scale,
        seed,
    };
    unsafe { finish(h.node.generate_lipsync(&video, &audio, params), out_path) }
}

/// Waveform variant: `samples` is a row-major `f32` buffer of shape
/// `shape[0..ndim]` (rank 1, 2 or 3).
///
/// @param out_path  Receives the output video path on success.
/// @return          `NULL` on success, otherwise an error message.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn latentsync_generate_from_waveform(
    node: *mut LatentSyncHandle,
    video_path: *const c_char,
    samples: *const f32,
    shape: *const usize,
    ndim: usize,
    sample_rate: u32,
    inference_steps: u32,
    guidance_scale: f32,
    seed: i64,
    out_path: *mut *const c_char,
) -> *const c_char {
    if node.is_null() {
        return to_c_str("null node handle");
    }
    if samples.is_null() || (shape.is_null() && ndim > 0) {
        return to_c_str("null waveform buffer");
    }
    let h = unsafe { &mut *node };
    let video = unsafe { cstr_to_string(video_path) }.unwrap_or_default();

    // Rank 0 is passed through empty and rejected by the node.
    let (shape, data) = if ndim == 0 {
        (Vec::new(), Vec::new())
    } else {
        let shape = unsafe { std::slice::from_raw_parts(shape, ndim) }.to_vec();
        let Some(len) = shape.iter().try_fold(1usize, |acc, d| acc.checked_mul(*d)) else {
            return to_c_str("waveform shape overflows");
        };
        let data = unsafe { std::slice::from_raw_parts(samples, len) }.to_vec();
        (shape, data)
    };

    let params = GenerationParams {
        inference_steps,
        guidance_scale,
        seed,
    };
    let waveform = Waveform::new(data, shape, sample_rate);
    unsafe {
        finish(
            h.node.generate_lipsync_from_waveform(&video, &waveform, params),
            out_path,
        )
    }
}

/// Free a string returned by any function in this module.
#[no_mangle]
pub unsafe extern "C" fn latentsync_free_string(s: *const c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s as *mut c_char) });
    }
}

/// Destroy a node handle.
#[no_mangle]
pub unsafe extern "C" fn latentsync_node_free(node: *mut LatentSyncHandle) {
    if !node.is_null() {
        drop(unsafe { Box::from_raw(node) });
    }
}
