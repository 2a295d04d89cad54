//! Building pacts through handles.
//!
//! Every function here edits a registered pact. Edits fail once a mock
//! server has been started for the pact.

use crate::handles::{self, FfiError, InteractionHandle, PactHandle};
use crate::util::{c_str, guard, into_c_string};
use pact_consumer::editor;
use pact_models::{InteractionKind, InteractionPart, PactSpecification};
use serde_json::{Map, Value};
use std::ffi::{c_char, c_int, c_uint};
use std::path::Path;
use tracing::warn;

/// Outcome of a call that may explain its failure.
///
/// Non-null strings are owned by the caller and released with
/// `pactffi_string_delete`.
#[repr(C)]
#[derive(Debug)]
pub enum StringResult {
    /// Success, with an optional value
    Ok(*mut c_char),
    /// Failure, with the error message
    Failed(*mut c_char),
}

fn check<T>(function: &'static str, result: Result<T, FfiError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(function, error = %error, "FFI call failed");
            None
        }
    }
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, FfiError> {
    value.ok_or(FfiError::InvalidArgument(name))
}

/// Interaction part from its C value: `0` request, `1` response.
fn interaction_part(part: c_uint) -> Result<InteractionPart, FfiError> {
    match part {
        0 => Ok(InteractionPart::Request),
        1 => Ok(InteractionPart::Response),
        _ => Err(FfiError::InvalidArgument("part")),
    }
}

/// Specification from its C value: `0` unknown, then `1` to `5` for V1,
/// V1.1, V2, V3 and V4.
const fn specification(value: c_uint) -> Option<PactSpecification> {
    match value {
        0 => Some(PactSpecification::Unknown),
        1 => Some(PactSpecification::V1),
        2 => Some(PactSpecification::V1_1),
        3 => Some(PactSpecification::V2),
        4 => Some(PactSpecification::V3),
        5 => Some(PactSpecification::V4),
        _ => None,
    }
}

fn default_content_type(body: Option<&str>) -> &'static str {
    match body.map(serde_json::from_str::<Value>) {
        Some(Ok(_)) => "application/json",
        _ => "text/plain",
    }
}

/// Create a new pact between `consumer_name` and `provider_name`.
///
/// Returns `0` when either name is missing or empty.
///
/// # Safety
///
/// Both arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_new_pact(consumer_name: *const c_char, provider_name: *const c_char) -> PactHandle {
    guard("pactffi_new_pact", 0, || {
        // SAFETY: forwarded from the caller.
        let (consumer, provider) = unsafe { (c_str(consumer_name), c_str(provider_name)) };
        let created = (|| -> Result<PactHandle, FfiError> {
            let pact = pact_consumer::Pact::new(required(consumer, "consumer_name")?, required(provider, "provider_name")?)?;
            handles::register(pact.into()).ok_or(FfiError::InvalidHandle(0))
        })();
        check("pactffi_new_pact", created).unwrap_or(0)
    })
}

/// Set the specification version of a pact.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_with_specification(pact: PactHandle, version: c_uint) -> bool {
    guard("pactffi_with_specification", false, || {
        let result = specification(version)
            .ok_or(FfiError::InvalidArgument("version"))
            .and_then(|version| handles::with_pact(pact, |document| document.specification = version));
        check("pactffi_with_specification", result).is_some()
    })
}

/// Set a metadata entry in a pact namespace.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_pact_metadata(
    pact: PactHandle,
    namespace: *const c_char,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    guard("pactffi_with_pact_metadata", false, || {
        // SAFETY: forwarded from the caller.
        let (namespace, name, value) = unsafe { (c_str(namespace), c_str(name), c_str(value)) };
        let result = (|| -> Result<(), FfiError> {
            let mut values = Map::new();
            values.insert(
                required(name, "name")?.to_string(),
                Value::String(required(value, "value")?.to_string()),
            );
            let namespace = required(namespace, "namespace")?;
            handles::with_pact(pact, |document| document.add_metadata(namespace, values))
        })();
        check("pactffi_with_pact_metadata", result).is_some()
    })
}

unsafe fn new_interaction_of(
    function: &'static str,
    pact: PactHandle,
    kind: InteractionKind,
    description: *const c_char,
) -> InteractionHandle {
    guard(function, 0, || {
        // SAFETY: forwarded from the caller.
        let description = unsafe { c_str(description) };
        let result = required(description, "description")
            .and_then(|description| handles::open_interaction(pact, kind, description));
        check(function, result).unwrap_or(0)
    })
}

/// Add an HTTP interaction, or reopen the one with the same description.
///
/// # Safety
///
/// `description` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_new_interaction(pact: PactHandle, description: *const c_char) -> InteractionHandle {
    // SAFETY: forwarded from the caller.
    unsafe { new_interaction_of("pactffi_new_interaction", pact, InteractionKind::Http, description) }
}

/// Add an asynchronous message interaction.
///
/// # Safety
///
/// `description` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_new_message_interaction(
    pact: PactHandle,
    description: *const c_char,
) -> InteractionHandle {
    // SAFETY: forwarded from the caller.
    unsafe {
        new_interaction_of(
            "pactffi_new_message_interaction",
            pact,
            InteractionKind::AsyncMessage,
            description,
        )
    }
}

/// Add a synchronous message interaction.
///
/// # Safety
///
/// `description` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_new_sync_message_interaction(
    pact: PactHandle,
    description: *const c_char,
) -> InteractionHandle {
    // SAFETY: forwarded from the caller.
    unsafe {
        new_interaction_of(
            "pactffi_new_sync_message_interaction",
            pact,
            InteractionKind::SyncMessage,
            description,
        )
    }
}

/// Add a provider state.
///
/// # Safety
///
/// `description` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_given(interaction: InteractionHandle, description: *const c_char) -> bool {
    guard("pactffi_given", false, || {
        // SAFETY: forwarded from the caller.
        let description = unsafe { c_str(description) };
        let result = required(description, "description")
            .and_then(|state| handles::with_interaction(interaction, |i| editor::given(i, state)));
        check("pactffi_given", result).is_some()
    })
}

/// Add a provider state with one parameter. Values that parse as JSON are
/// stored as JSON.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_given_with_param(
    interaction: InteractionHandle,
    description: *const c_char,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    guard("pactffi_given_with_param", false, || {
        // SAFETY: forwarded from the caller.
        let (description, name, value) = unsafe { (c_str(description), c_str(name), c_str(value)) };
        let result = (|| -> Result<(), FfiError> {
            let state = required(description, "description")?;
            let name = required(name, "name")?;
            let value = required(value, "value")?;
            handles::with_interaction(interaction, |i| editor::given_with_param(i, state, name, value))
        })();
        check("pactffi_given_with_param", result).is_some()
    })
}

/// Add a provider state with parameters given as a JSON object.
///
/// Returns `0` on success, `1` when `params` is not a JSON object (it is
/// stored under `value`), `2` when a mock server was already started, `3`
/// for an invalid handle and `4` when `description` is missing.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_given_with_params(
    interaction: InteractionHandle,
    description: *const c_char,
    params: *const c_char,
) -> c_int {
    guard("pactffi_given_with_params", 3, || {
        // SAFETY: forwarded from the caller.
        let (description, params) = unsafe { (c_str(description), c_str(params)) };
        let Some(state) = description else {
            return 4;
        };
        let params = params.unwrap_or("{}");
        let is_object = matches!(serde_json::from_str::<Value>(params), Ok(Value::Object(_)));
        match handles::with_interaction(interaction, |i| editor::given_with_params(i, state, params)) {
            Ok(()) if is_object => 0,
            Ok(()) => 1,
            Err(FfiError::MockServerStarted(_)) => 2,
            Err(error) => {
                warn!(error = %error, "pactffi_given_with_params failed");
                3
            }
        }
    })
}

/// Set the request method and path. The path may be matcher JSON.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_request(
    interaction: InteractionHandle,
    method: *const c_char,
    path: *const c_char,
) -> bool {
    guard("pactffi_with_request", false, || {
        // SAFETY: forwarded from the caller.
        let (method, path) = unsafe { (c_str(method), c_str(path)) };
        let method = method.unwrap_or("GET");
        let path = path.unwrap_or("/");
        let result = handles::with_interaction(interaction, |i| editor::with_request(i, method, path))
            .and_then(|r| r.map_err(FfiError::from));
        check("pactffi_with_request", result).is_some()
    })
}

/// Set one value of a header. `value` may be matcher JSON.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_header_v2(
    interaction: InteractionHandle,
    part: c_uint,
    name: *const c_char,
    index: usize,
    value: *const c_char,
) -> bool {
    guard("pactffi_with_header_v2", false, || {
        // SAFETY: forwarded from the caller.
        let (name, value) = unsafe { (c_str(name), c_str(value)) };
        let result = (|| -> Result<(), FfiError> {
            let part = interaction_part(part)?;
            let name = required(name, "name")?;
            let value = required(value, "value")?;
            handles::with_interaction(interaction, |i| editor::with_header(i, part, name, index, value))??;
            Ok(())
        })();
        check("pactffi_with_header_v2", result).is_some()
    })
}

/// Set a header to a raw value, replacing any previous values.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_set_header(
    interaction: InteractionHandle,
    part: c_uint,
    name: *const c_char,
    value: *const c_char,
) -> bool {
    guard("pactffi_set_header", false, || {
        // SAFETY: forwarded from the caller.
        let (name, value) = unsafe { (c_str(name), c_str(value)) };
        let result = (|| -> Result<(), FfiError> {
            let part = interaction_part(part)?;
            let name = required(name, "name")?;
            let value = required(value, "value")?;
            handles::with_interaction(interaction, |i| editor::set_header_value(i, part, name, 0, value))
        })();
        check("pactffi_set_header", result).is_some()
    })
}

/// Set one value of a query parameter. `value` may be matcher JSON.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_query_parameter_v2(
    interaction: InteractionHandle,
    name: *const c_char,
    index: usize,
    value: *const c_char,
) -> bool {
    guard("pactffi_with_query_parameter_v2", false, || {
        // SAFETY: forwarded from the caller.
        let (name, value) = unsafe { (c_str(name), c_str(value)) };
        let result = (|| -> Result<(), FfiError> {
            let name = required(name, "name")?;
            let value = required(value, "value")?;
            handles::with_interaction(interaction, |i| editor::with_query_parameter(i, name, index, value))??;
            Ok(())
        })();
        check("pactffi_with_query_parameter_v2", result).is_some()
    })
}

/// Set the body of a request, response or message. JSON bodies may carry
/// matchers. A null body leaves the part without a body.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_body(
    interaction: InteractionHandle,
    part: c_uint,
    content_type: *const c_char,
    body: *const c_char,
) -> bool {
    guard("pactffi_with_body", false, || {
        // SAFETY: forwarded from the caller.
        let (content_type, body) = unsafe { (c_str(content_type), c_str(body)) };
        let result = (|| -> Result<(), FfiError> {
            let part = interaction_part(part)?;
            let content_type = content_type.unwrap_or_else(|| default_content_type(body));
            handles::with_interaction(interaction, |i| editor::with_body(i, part, content_type, body))??;
            Ok(())
        })();
        check("pactffi_with_body", result).is_some()
    })
}

/// Set a binary body matched by content type.
///
/// # Safety
///
/// `content_type` must be null or a valid NUL-terminated string, and `body`
/// must be null or point to `size` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_binary_file(
    interaction: InteractionHandle,
    part: c_uint,
    content_type: *const c_char,
    body: *const u8,
    size: usize,
) -> bool {
    guard("pactffi_with_binary_file", false, || {
        // SAFETY: forwarded from the caller.
        let content_type = unsafe { c_str(content_type) }.unwrap_or("application/octet-stream");
        let bytes = if body.is_null() {
            None
        } else {
            // SAFETY: non-null and `size` bytes long per the caller's contract.
            Some(unsafe { std::slice::from_raw_parts(body, size) })
        };
        let result = interaction_part(part).and_then(|part| {
            handles::with_interaction(interaction, |i| editor::with_binary_file(i, part, content_type, bytes))
        });
        check("pactffi_with_binary_file", result).is_some()
    })
}

/// Set a `multipart/form-data` body holding the file at `file`.
///
/// On failure the result carries the error message.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_with_multipart_file_v2(
    interaction: InteractionHandle,
    part: c_uint,
    content_type: *const c_char,
    file: *const c_char,
    part_name: *const c_char,
    boundary: *const c_char,
) -> StringResult {
    guard("pactffi_with_multipart_file_v2", None, || {
        // SAFETY: forwarded from the caller.
        let (content_type, file, part_name, boundary) =
            unsafe { (c_str(content_type), c_str(file), c_str(part_name), c_str(boundary)) };
        let result = (|| -> Result<(), FfiError> {
            let part = interaction_part(part)?;
            let content_type = content_type.unwrap_or("application/octet-stream");
            let part_name = required(part_name, "part_name")?;
            handles::with_interaction(interaction, |i| {
                editor::with_multipart_file(i, part, content_type, file.map(Path::new), part_name, boundary)
            })??;
            Ok(())
        })();
        Some(match result {
            Ok(()) => StringResult::Ok(std::ptr::null_mut()),
            Err(error) => {
                warn!(error = %error, "pactffi_with_multipart_file_v2 failed");
                StringResult::Failed(into_c_string(error.to_string()))
            }
        })
    })
    .unwrap_or_else(|| StringResult::Failed(into_c_string("pactffi_with_multipart_file_v2 panicked".to_string())))
}

/// Set the response status.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_response_status(interaction: InteractionHandle, status: u16) -> bool {
    guard("pactffi_response_status", false, || {
        let result = handles::with_interaction(interaction, |i| editor::response_status(i, status))
            .and_then(|r| r.map_err(FfiError::from));
        check("pactffi_response_status", result).is_some()
    })
}

/// Record the name of the test that declared the interaction.
///
/// Returns `0` on success, `1` on panic, `2` for an invalid handle, `3` when
/// a mock server was already started and `4` when `name` is missing.
///
/// # Safety
///
/// `name` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_interaction_test_name(interaction: InteractionHandle, name: *const c_char) -> c_uint {
    guard("pactffi_interaction_test_name", 1, || {
        // SAFETY: forwarded from the caller.
        let Some(name) = (unsafe { c_str(name) }) else {
            return 4;
        };
        match handles::with_interaction(interaction, |i| editor::test_name(i, name)) {
            Ok(()) => 0,
            Err(FfiError::MockServerStarted(_)) => 3,
            Err(_) => 2,
        }
    })
}

/// Write a pact to `directory` (the working directory when null), merging
/// with an existing file unless `overwrite` is set.
///
/// Returns `0` on success, `1` on panic, `2` when the file could not be
/// written and `3` for an invalid handle.
///
/// # Safety
///
/// `directory` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_pact_handle_write_file(
    pact: PactHandle,
    directory: *const c_char,
    overwrite: bool,
) -> c_int {
    guard("pactffi_pact_handle_write_file", 1, || {
        // SAFETY: forwarded from the caller.
        let directory = Path::new(unsafe { c_str(directory) }.unwrap_or("."));
        match handles::with_entry(pact, |entry| entry.pact.write_file(directory, overwrite)) {
            Ok(Ok(_)) => 0,
            Ok(Err(error)) => {
                warn!(error = %error, "Failed to write pact file");
                2
            }
            Err(_) => 3,
        }
    })
}

/// Remove a pact from the registry.
///
/// Returns `0` on success and `1` for an unknown handle.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_free_pact_handle(pact: PactHandle) -> c_uint {
    guard("pactffi_free_pact_handle", 1, || u32::from(!handles::release(pact)))
}
