//! C boundary for FLAC decoding.
//!
//! Two access modes over the same decoding core: `flacbridge_decode_file`
//! produces one caller-owned interleaved f32 buffer for the whole file;
//! `flacbridge_stream_open`/`read`/`seek`/`close` expose an incremental
//! session behind an opaque handle. Every failing export records a
//! message readable via `flacbridge_last_error` on the calling thread.
//!
//! Samples are always interleaved f32, nominally in [-1.0, 1.0]. A handle
//! must be driven from one thread at a time; independent handles are
//! independent. Use after `flacbridge_stream_close` is the caller's
//! undefined behaviour, as is releasing a buffer this library did not
//! allocate.

use std::alloc::Layout;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use flacbridge_decode::FlacStream;

mod ffi_guard;
mod last_error;
mod runtime;


use crate::ffi_guard::{guard_status, guard_void, guard_with_default};
use crate::last_error::set_last_error;
use crate::runtime::init_tracing;

// Single in-development ABI version (early-stage project).
pub const FLACBRIDGE_ABI_VERSION: u32 = 1;

// Status codes. 0 = OK; each failure family gets a distinct value.
pub const FB_OK: i32 = 0;
pub const FB_ERR_INVALID_ARG: i32 = 1;
pub const FB_ERR_OPEN: i32 = 2;
pub const FB_ERR_ALLOC: i32 = 3;
pub const FB_ERR_DECODE: i32 = 4;
pub const FB_ERR_SEEK: i32 = 5;
pub const FB_ERR_INTERNAL: i32 = 6;

/// Bulk decode result crossing the ABI. Field order is part of the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FbAudioInfo {
    pub sample_rate: i32,
    pub channels: i32,
    /// PCM frames (samples per channel) in `pcm_data`.
    pub total_frame_count: u64,
    /// Interleaved f32 samples owned by this library until
    /// `flacbridge_free_pcm`; null when no data was produced.
    pub pcm_data: *mut f32,
    /// Sample count (frames * channels) behind `pcm_data`.
    pub pcm_data_len: usize,
}

impl FbAudioInfo {
    pub const fn empty() -> Self {
        Self {
            sample_rate: 0,
            channels: 0,
            total_frame_count: 0,
            pcm_data: ptr::null_mut(),
            pcm_data_len: 0,
        }
    }
}

/// Opaque streaming session handle. Hosts only ever see `*mut FbStream`.
pub struct FbStream {
    inner: FlacStream,
}

fn cstr_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// ABI contract version of this library.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_abi_version() -> u32 {
    FLACBRIDGE_ABI_VERSION
}

/// The calling thread's most recent failure message, empty before any
/// failure. The pointer is valid until the next failing call on the same
/// thread.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_last_error() -> *const c_char {
    guard_with_default("flacbridge_last_error", ptr::null(), last_error::last_error_ptr)
}

/// Decode an entire FLAC file into one freshly allocated interleaved f32
/// buffer, handing ownership of the buffer to the caller. The caller must
/// release it exactly once via `flacbridge_free_pcm`. No session survives
/// the call.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_decode_file(path: *const c_char, out_info: *mut FbAudioInfo) -> i32 {
    guard_status("flacbridge_decode_file", || {
        init_tracing();

        let Some(info) = (unsafe { out_info.as_mut() }) else {
            set_last_error("null output info");
            return FB_ERR_INVALID_ARG;
        };
        *info = FbAudioInfo::empty();

        let Some(path) = cstr_arg(path) else {
            set_last_error("null or non-utf8 path");
            return FB_ERR_INVALID_ARG;
        };

        let mut stream = match FlacStream::open(path) {
            Ok(stream) => stream,
            Err(e) => {
                set_last_error(format!("failed to open flac stream `{path}`: {e}"));
                return FB_ERR_OPEN;
            },
        };
        let spec = stream.spec();
        let channels = spec.channels.max(1) as usize;
        let total_samples = (spec.total_frames as usize).saturating_mul(channels);

        let pcm_data = if total_samples == 0 {
            ptr::null_mut()
        } else {
            let Ok(layout) = Layout::array::<f32>(total_samples) else {
                set_last_error(format!("pcm buffer of {total_samples} samples is unrepresentable"));
                return FB_ERR_ALLOC;
            };
            // Zeroed so no uninitialised memory is ever viewed as f32.
            let raw = unsafe { std::alloc::alloc_zeroed(layout) } as *mut f32;
            if raw.is_null() {
                set_last_error(format!("failed to allocate pcm buffer of {total_samples} samples"));
                return FB_ERR_ALLOC;
            }

            let out = unsafe { std::slice::from_raw_parts_mut(raw, total_samples) };
            let result = stream.read_all(out);
            match result {
                Ok(filled) if filled == spec.total_frames => raw,
                outcome => {
                    // Corruption, never partial success: the buffer does
                    // not escape.
                    unsafe { std::alloc::dealloc(raw as *mut u8, layout) };
                    match outcome {
                        Ok(filled) => set_last_error(format!(
                            "decoded {filled} of {} declared frames from `{path}` (truncated or corrupt stream)",
                            spec.total_frames
                        )),
                        Err(e) => set_last_error(format!("decode failed for `{path}`: {e}")),
                    }
                    return FB_ERR_DECODE;
                },
            }
        };

        info.sample_rate = spec.sample_rate as i32;
        info.channels = i32::from(spec.channels);
        info.total_frame_count = spec.total_frames;
        info.pcm_data = pcm_data;
        info.pcm_data_len = total_samples;
        FB_OK
    })
}

/// Release a buffer produced by `flacbridge_decode_file` and clear the
/// pointer/length fields. Idempotent: a null `info`, null buffer, or an
/// already-cleared struct is a no-op. Must never be given a buffer from
/// anywhere else.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_free_pcm(info: *mut FbAudioInfo) {
    guard_void("flacbridge_free_pcm", || {
        let Some(info) = (unsafe { info.as_mut() }) else {
            return;
        };
        if !info.pcm_data.is_null() && info.pcm_data_len != 0 {
            // Same layout as the allocation in `flacbridge_decode_file`.
            if let Ok(layout) = Layout::array::<f32>(info.pcm_data_len) {
                unsafe { std::alloc::dealloc(info.pcm_data as *mut u8, layout) };
            }
        }
        info.pcm_data = ptr::null_mut();
        info.pcm_data_len = 0;
    })
}

/// Open a streaming session. On success the returned handle owns the
/// decode cursor (starting at frame 0) and the out-params carry the
/// stream format; on failure the result is null and the error is readable
/// via `flacbridge_last_error`.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_stream_open(
    path: *const c_char,
    out_sample_rate: *mut i32,
    out_channels: *mut i32,
    out_total_frames: *mut u64,
) -> *mut FbStream {
    guard_with_default("flacbridge_stream_open", ptr::null_mut(), || {
        init_tracing();

        let Some(path) = cstr_arg(path) else {
            set_last_error("null or non-utf8 path");
            return ptr::null_mut();
        };
        if out_sample_rate.is_null() || out_channels.is_null() || out_total_frames.is_null() {
            set_last_error("null format out-params");
            return ptr::null_mut();
        }

        match FlacStream::open(path) {
            Ok(stream) => {
                let spec = stream.spec();
                unsafe {
                    *out_sample_rate = spec.sample_rate as i32;
                    *out_channels = i32::from(spec.channels);
                    *out_total_frames = spec.total_frames;
                }
                Box::into_raw(Box::new(FbStream { inner: stream }))
            },
            Err(e) => {
                set_last_error(format!("failed to open flac stream `{path}`: {e}"));
                ptr::null_mut()
            },
        }
    })
}

/// Pull up to `frames` interleaved frames into `out_interleaved`, which
/// the caller guarantees holds `frames * channels` floats (not
/// re-validated). Returns the count actually produced — 0 signals end of
/// stream and is not an error; partial reads are legal. Returns -1 on
/// error with the cursor unchanged.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_stream_read(
    stream: *mut FbStream,
    out_interleaved: *mut f32,
    frames: u64,
) -> i64 {
    guard_with_default("flacbridge_stream_read", -1, || {
        let Some(handle) = (unsafe { stream.as_mut() }) else {
            set_last_error("null stream handle");
            return -1;
        };
        if out_interleaved.is_null() {
            set_last_error("null output buffer");
            return -1;
        }

        let spec = handle.inner.spec();
        let remaining = spec.total_frames - handle.inner.position();
        let want = frames.min(remaining) as usize;
        if want == 0 {
            return 0;
        }
        let samples = want.saturating_mul(spec.channels.max(1) as usize);
        let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, samples) };
        match handle.inner.read(out, want) {
            Ok(produced) => produced as i64,
            Err(e) => {
                set_last_error(format!("stream read failed: {e}"));
                -1
            },
        }
    })
}

/// Move the session cursor to `frame_index`. Targets past the final frame
/// are a decode-engine failure (reported, never clamped); the cursor is
/// unchanged on failure. Seeking to exactly the total frame count is
/// valid and makes the next read return 0.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_stream_seek(stream: *mut FbStream, frame_index: u64) -> i32 {
    guard_status("flacbridge_stream_seek", || {
        let Some(handle) = (unsafe { stream.as_mut() }) else {
            set_last_error("null stream handle");
            return FB_ERR_INVALID_ARG;
        };
        match handle.inner.seek(frame_index) {
            Ok(()) => FB_OK,
            Err(e) => {
                set_last_error(format!("seek to frame {frame_index} failed: {e}"));
                FB_ERR_SEEK
            },
        }
    })
}

/// Close a session and release everything it owns. Null is a no-op. Any
/// use of the handle after this call is undefined.
#[unsafe(no_mangle)]
pub extern "C" fn flacbridge_stream_close(stream: *mut FbStream) {
    guard_void("flacbridge_stream_close", || {
        if stream.is_null() {
            return;
        }
        drop(unsafe { Box::from_raw(stream) });
    })
}
