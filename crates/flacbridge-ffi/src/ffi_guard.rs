//! FFI panic guard utilities.
//!
//! Every `extern "C" fn` exported by this crate must catch panics to avoid
//! undefined behaviour at the FFI boundary. These helpers centralise that
//! logic so each export can call `guard_status`, `guard_void`, or
//! `guard_with_default` instead of duplicating `catch_unwind` boilerplate.

use tracing::error;

use crate::FB_ERR_INTERNAL;
use crate::last_error::set_last_error;

/// Extract a human-readable message from a panic payload.
fn panic_message(payload: Box<dyn core::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

fn report_panic(op: &'static str, payload: Box<dyn core::any::Any + Send>) {
    let msg = panic_message(payload);
    let bt = std::backtrace::Backtrace::force_capture();
    error!("panic in ffi `{op}`: {msg}\nbacktrace:\n{bt}");
    set_last_error(format!("panic in ffi `{op}`: {msg}"));
}

/// Catch panics in exports that return a status code.
pub(crate) fn guard_status(op: &'static str, f: impl FnOnce() -> i32) -> i32 {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(code) => code,
        Err(payload) => {
            report_panic(op, payload);
            FB_ERR_INTERNAL
        }
    }
}

/// Catch panics in exports that return nothing.
pub(crate) fn guard_void(op: &'static str, f: impl FnOnce()) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        report_panic(op, payload);
    }
}

/// Catch panics in exports that return a value with a known safe default.
pub(crate) fn guard_with_default<T>(op: &'static str, default: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(val) => val,
        Err(payload) => {
            report_panic(op, payload);
            default
        }
    }
}
