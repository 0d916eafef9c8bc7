//! Per-thread last-error channel.
//!
//! Each calling thread owns one message slot, overwritten by that thread's
//! most recent failing export. Thread-local scoping is what makes the
//! channel safe for hosts driving independent sessions from multiple
//! threads without locks.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

/// Record `msg` as the calling thread's most recent failure. Must be the
/// final side effect on every failure path before the sentinel returns.
pub(crate) fn set_last_error(msg: impl Into<String>) {
    let msg = msg.into();
    let c = CString::new(msg.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = c);
}

/// Pointer to the current thread's message. Valid until the next failing
/// call on the same thread; empty string before any failure.
pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|slot| slot.borrow().as_ptr())
}
