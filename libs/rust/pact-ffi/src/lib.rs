//! C interface to the pact crates.
//!
//! Wrappers in other languages drive the consumer DSL, the mock server and
//! the verifier through these exports:
//! - Pacts and interactions are addressed by integer handles; `0` is never a
//!   valid handle
//! - Strings returned to the caller are released with
//!   [`pactffi_string_delete`]
//! - No export unwinds; panics are logged and reported through the
//!   function's failure value

pub mod consumer;
pub mod handles;
pub mod mock_server;
mod util;
pub mod verifier;

pub use consumer::StringResult;
pub use handles::{FfiError, InteractionHandle, PactHandle};

use pact_common::{TracingConfig, init_tracing};
use std::ffi::{CString, c_char};
use util::{c_str, guard};

/// Library version as a static NUL-terminated string.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// Install a log subscriber writing to stderr at `level` (`error`, `warn`,
/// `info`, `debug`, `trace` or `off`; `info` when null or unknown).
/// `RUST_LOG` wins over `level`. Later calls have no effect.
///
/// # Safety
///
/// `level` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_init_with_log_level(level: *const c_char) {
    guard("pactffi_init_with_log_level", (), || {
        // SAFETY: forwarded from the caller.
        let level = unsafe { c_str(level) }.unwrap_or("info");
        let config = TracingConfig::for_component("pact-ffi");
        let config = config.clone().with_level(level).unwrap_or(config);
        init_tracing(&config);
    });
}

/// Release a string returned by this library. Null is ignored.
///
/// # Safety
///
/// `string` must be null or a pointer returned by this library that has
/// not been released yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_string_delete(string: *mut c_char) {
    if !string.is_null() {
        // SAFETY: allocated by `CString::into_raw` per the caller's contract.
        drop(unsafe { CString::from_raw(string) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_version_is_not_empty() {
        let version = unsafe { CStr::from_ptr(pactffi_version()) };
        let version = version.to_str().unwrap();
        assert!(!version.is_empty());
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_string_delete_ignores_null() {
        unsafe { pactffi_string_delete(std::ptr::null_mut()) };
    }
}
