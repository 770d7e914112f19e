//! Console output entry points (`__print`, `__println`).

use std::ffi::{c_char, CStr};
use std::io::Write;

/// Prints a string without a trailing newline. Null is a no-op.
///
/// # Safety
///
/// `text` must be null or a NUL-terminated buffer.
pub unsafe extern "C" fn __print(text: *const c_char) {
    if text.is_null() {
        return;
    }
    // SAFETY: caller guarantees termination.
    let bytes = unsafe { CStr::from_ptr(text) }.to_bytes();
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(bytes);
    let _ = stdout.flush();
}

/// Prints a string followed by a newline. Null is a no-op.
///
/// # Safety
///
/// `text` must be null or a NUL-terminated buffer.
pub unsafe extern "C" fn __println(text: *const c_char) {
    if text.is_null() {
        return;
    }
    // SAFETY: caller guarantees termination.
    let bytes = unsafe { CStr::from_ptr(text) }.to_bytes();
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(bytes);
    let _ = stdout.write_all(b"\n");
    let _ = stdout.flush();
}
