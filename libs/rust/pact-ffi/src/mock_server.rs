//! Mock server lifecycle.
//!
//! Servers run on a runtime owned by this library and are looked up by the
//! port they listen on.

use crate::handles::{self, FfiError, PactHandle};
use crate::util::{c_str, guard, into_c_string};
use once_cell::sync::{Lazy, OnceCell};
use pact_common::{PactError, PactResult};
use pact_mock_server::{MockOutcome, MockServer, MockServerConfig};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ffi::{c_char, c_int};
use std::path::Path;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

struct RunningServer {
    pact: PactHandle,
    server: MockServer,
}

static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static SERVERS: Lazy<Mutex<BTreeMap<u16, RunningServer>>> = Lazy::new(|| Mutex::new(BTreeMap::new()));

/// The runtime every asynchronous FFI call runs on.
pub(crate) fn runtime() -> PactResult<&'static Runtime> {
    RUNTIME.get_or_try_init(|| {
        Builder::new_multi_thread()
            .enable_all()
            .thread_name("pact-ffi")
            .build()
            .map_err(PactError::from)
    })
}

fn port_of(port: c_int) -> Option<u16> {
    u16::try_from(port).ok()
}

fn start(pact: PactHandle, config: MockServerConfig) -> Result<u16, FfiError> {
    let document = handles::with_entry(pact, |entry| entry.pact.clone())?;
    let server = runtime()?.block_on(MockServer::start(document, config))?;
    let port = server.port();
    handles::with_entry(pact, |entry| entry.mock_server_port = Some(port))?;
    SERVERS.lock().insert(port, RunningServer { pact, server });
    Ok(port)
}

/// Start a mock server for a pact's HTTP interactions.
///
/// `port` `0` picks a free port. Returns the bound port, or a negative
/// code: `-1` invalid handle, `-2` invalid transport configuration, `-3`
/// the server could not start, `-4` panic, `-5` invalid address.
///
/// The pact can no longer be edited while the server runs.
///
/// # Safety
///
/// The string arguments must be null or valid NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_create_mock_server_for_transport(
    pact: PactHandle,
    addr: *const c_char,
    port: u16,
    transport: *const c_char,
    transport_config: *const c_char,
) -> c_int {
    guard("pactffi_create_mock_server_for_transport", -4, || {
        // SAFETY: forwarded from the caller.
        let (addr, transport, transport_config) = unsafe { (c_str(addr), c_str(transport), c_str(transport_config)) };
        let Some(addr) = addr.filter(|a| !a.trim().is_empty()) else {
            return -5;
        };
        let config = MockServerConfig::default()
            .with_host(addr)
            .with_port(port)
            .with_transport(transport.unwrap_or("http"))
            .with_transport_config(transport_config);
        let config = match config {
            Ok(config) => config,
            Err(error) => {
                warn!(error = %error, "Invalid transport configuration");
                return -2;
            }
        };
        match start(pact, config) {
            Ok(port) => c_int::from(port),
            Err(FfiError::InvalidHandle(_)) => -1,
            Err(error) => {
                warn!(error = %error, "Failed to start mock server");
                -3
            }
        }
    })
}

/// True when the server on `port` received every expected request and
/// nothing else.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_mock_server_matched(port: c_int) -> bool {
    guard("pactffi_mock_server_matched", false, || {
        port_of(port)
            .and_then(|port| SERVERS.lock().get(&port).map(|running| running.server.matched()))
            .unwrap_or(false)
    })
}

/// Mismatches of the server on `port` as a JSON array, or null when there
/// is no such server. The caller releases the string with
/// `pactffi_string_delete`.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_mock_server_mismatches(port: c_int) -> *mut c_char {
    guard("pactffi_mock_server_mismatches", std::ptr::null_mut(), || {
        let mismatches = port_of(port).and_then(|port| {
            SERVERS
                .lock()
                .get(&port)
                .map(|running| running.server.mismatches())
        });
        mismatches.map_or(std::ptr::null_mut(), |mismatches| {
            let json: Vec<Value> = mismatches.iter().map(MockOutcome::to_json).collect();
            into_c_string(Value::Array(json).to_string())
        })
    })
}

/// Write the pact served on `port` to `directory` (the working directory
/// when null).
///
/// Returns `0` on success, `1` on panic, `2` when the file could not be
/// written and `3` when no server runs on `port`.
///
/// # Safety
///
/// `directory` must be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn pactffi_write_pact_file(port: c_int, directory: *const c_char, overwrite: bool) -> c_int {
    guard("pactffi_write_pact_file", 1, || {
        // SAFETY: forwarded from the caller.
        let directory = Path::new(unsafe { c_str(directory) }.unwrap_or("."));
        let servers = SERVERS.lock();
        let Some(running) = port_of(port).and_then(|port| servers.get(&port)) else {
            return 3;
        };
        match running.server.write_pact(directory, overwrite) {
            Ok(path) => {
                info!(path = %path.display(), "Pact file written");
                0
            }
            Err(error) => {
                warn!(error = %error, "Failed to write pact file");
                2
            }
        }
    })
}

/// Stop the server on `port`. Returns false when there is none.
#[unsafe(no_mangle)]
pub extern "C" fn pactffi_cleanup_mock_server(port: c_int) -> bool {
    guard("pactffi_cleanup_mock_server", false, || {
        let Some(mut running) = port_of(port).and_then(|port| SERVERS.lock().remove(&port)) else {
            return false;
        };
        let stopped = runtime().and_then(|runtime| runtime.block_on(running.server.shutdown()));
        if let Err(error) = stopped {
            warn!(error = %error, "Mock server did not stop cleanly");
        }
        let _ = handles::with_entry(running.pact, |entry| entry.mock_server_port = None);
        true
    })
}
