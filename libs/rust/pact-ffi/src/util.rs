//! Conversions at the C boundary.

use std::any::Any;
use std::ffi::{CStr, CString, c_char};
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// Borrow a C string as UTF-8.
///
/// Returns `None` for null pointers and invalid UTF-8.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that stays valid
/// for `'a`.
pub(crate) unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and NUL-terminated per the caller's contract.
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

/// Hand a string to the caller, who releases it with `pactffi_string_delete`.
pub(crate) fn into_c_string(value: String) -> *mut c_char {
    let value = if value.contains('\0') { value.replace('\0', "") } else { value };
    CString::new(value).map_or(std::ptr::null_mut(), CString::into_raw)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run an export body, turning a panic into `on_panic`.
pub(crate) fn guard<T>(function: &'static str, on_panic: T, body: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            error!(function, panic = %panic_message(payload.as_ref()), "FFI call panicked");
            on_panic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_none() {
        assert!(unsafe { c_str(std::ptr::null()) }.is_none());
    }

    #[test]
    fn test_round_trip() {
        let raw = into_c_string("hello".to_string());
        assert_eq!(unsafe { c_str(raw) }, Some("hello"));
        drop(unsafe { CString::from_raw(raw) });
    }

    #[test]
    fn test_interior_nul_is_dropped() {
        let raw = into_c_string("a\0b".to_string());
        assert_eq!(unsafe { c_str(raw) }, Some("ab"));
        drop(unsafe { CString::from_raw(raw) });
    }

    #[test]
    fn test_guard_catches_panics() {
        let value = guard("test", -1, || -> i32 { panic!("boom") });
        assert_eq!(value, -1);
        assert_eq!(guard("test", -1, || 7), 7);
    }
}
