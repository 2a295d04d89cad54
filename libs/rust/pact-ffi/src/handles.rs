//! Pact and interaction handles.
//!
//! Pacts live in a process-wide registry keyed by a non-zero `u16`. An
//! interaction handle packs the pact handle into its upper 16 bits and the
//! interaction's index plus one into the lower 16, so `0` is never valid.

use once_cell::sync::Lazy;
use pact_common::PactError;
use pact_models::{Interaction, InteractionKind, Pact};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use thiserror::Error;

/// Handle to a pact in the registry.
pub type PactHandle = u16;

/// Handle to an interaction of a registered pact.
pub type InteractionHandle = u32;

/// Failures of handle based calls.
#[derive(Error, Debug)]
pub enum FfiError {
    /// No pact or interaction for the handle
    #[error("Invalid handle {0}")]
    InvalidHandle(u32),

    /// The pact is being served and can no longer change
    #[error("A mock server is already running on port {0}")]
    MockServerStarted(u16),

    /// A required argument was null or not UTF-8
    #[error("Argument '{0}' is null or not valid UTF-8")]
    InvalidArgument(&'static str),

    /// Error from the pact crates
    #[error(transparent)]
    Pact(#[from] PactError),
}

/// A registered pact.
#[derive(Debug)]
pub(crate) struct PactEntry {
    pub(crate) pact: Pact,
    pub(crate) mock_server_port: Option<u16>,
}

impl PactEntry {
    fn editable(&mut self) -> Result<&mut Pact, FfiError> {
        match self.mock_server_port {
            Some(port) => Err(FfiError::MockServerStarted(port)),
            None => Ok(&mut self.pact),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    pacts: BTreeMap<PactHandle, PactEntry>,
    last: PactHandle,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));

/// Register a pact, returning its handle, or `None` when every handle is in
/// use.
pub(crate) fn register(pact: Pact) -> Option<PactHandle> {
    let mut registry = REGISTRY.lock();
    let mut candidate = registry.last;
    for _ in 0..u16::MAX {
        candidate = candidate.wrapping_add(1).max(1);
        if !registry.pacts.contains_key(&candidate) {
            registry.last = candidate;
            registry.pacts.insert(
                candidate,
                PactEntry {
                    pact,
                    mock_server_port: None,
                },
            );
            return Some(candidate);
        }
    }
    None
}

/// Remove a pact. Returns false for unknown handles.
pub(crate) fn release(handle: PactHandle) -> bool {
    REGISTRY.lock().pacts.remove(&handle).is_some()
}

/// Run `f` on a registered pact.
pub(crate) fn with_entry<R>(handle: PactHandle, f: impl FnOnce(&mut PactEntry) -> R) -> Result<R, FfiError> {
    let mut registry = REGISTRY.lock();
    let entry = registry
        .pacts
        .get_mut(&handle)
        .ok_or(FfiError::InvalidHandle(u32::from(handle)))?;
    Ok(f(entry))
}

/// Run `f` on a pact that no mock server is serving.
pub(crate) fn with_pact<R>(handle: PactHandle, f: impl FnOnce(&mut Pact) -> R) -> Result<R, FfiError> {
    with_entry(handle, |entry| entry.editable().map(f))?
}

/// Find or create an interaction and return its handle.
pub(crate) fn open_interaction(
    handle: PactHandle,
    kind: InteractionKind,
    description: &str,
) -> Result<InteractionHandle, FfiError> {
    let index = with_pact(handle, |pact| match pact.find_interaction(kind, description) {
        Some(index) => Some(index),
        None if pact.interactions.len() < usize::from(u16::MAX) => {
            pact.interactions.push(Interaction::new(kind, description));
            Some(pact.interactions.len() - 1)
        }
        None => None,
    })?
    .ok_or_else(|| PactError::invalid_input("A pact cannot hold more interactions"))?;
    interaction_handle(handle, index).ok_or(FfiError::InvalidHandle(u32::from(handle)))
}

/// Run `f` on the interaction behind `handle`.
pub(crate) fn with_interaction<R>(
    handle: InteractionHandle,
    f: impl FnOnce(&mut Interaction) -> R,
) -> Result<R, FfiError> {
    let (pact_handle, index) = split(handle).ok_or(FfiError::InvalidHandle(handle))?;
    with_pact(pact_handle, |pact| pact.interactions.get_mut(index).map(f))?.ok_or(FfiError::InvalidHandle(handle))
}

fn interaction_handle(pact: PactHandle, index: usize) -> Option<InteractionHandle> {
    let slot = u16::try_from(index + 1).ok()?;
    Some((u32::from(pact) << 16) | u32::from(slot))
}

fn split(handle: InteractionHandle) -> Option<(PactHandle, usize)> {
    let pact = u16::try_from(handle >> 16).ok()?;
    let slot = handle & 0xFFFF;
    if pact == 0 || slot == 0 {
        return None;
    }
    Some((pact, usize::try_from(slot - 1).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pact() -> Pact {
        Pact::new("handle-consumer", "handle-provider").unwrap()
    }

    #[test]
    fn test_interaction_handle_layout() {
        assert_eq!(interaction_handle(3, 0), Some(0x0003_0001));
        assert_eq!(split(0x0003_0001), Some((3, 0)));
        assert_eq!(split(0x0003_0000), None);
        assert_eq!(split(0x0000_0001), None);
    }

    #[test]
    fn test_register_and_release() {
        let handle = register(pact()).unwrap();
        assert_ne!(handle, 0);
        assert!(release(handle));
        assert!(!release(handle));
        assert!(with_pact(handle, |_| ()).is_err());
    }

    #[test]
    fn test_reopening_an_interaction() {
        let handle = register(pact()).unwrap();
        let first = open_interaction(handle, InteractionKind::Http, "a request").unwrap();
        let again = open_interaction(handle, InteractionKind::Http, "a request").unwrap();
        let other = open_interaction(handle, InteractionKind::AsyncMessage, "a request").unwrap();
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(with_interaction(other, |i| i.kind()).unwrap(), InteractionKind::AsyncMessage);
        release(handle);
    }

    #[test]
    fn test_served_pact_is_locked() {
        let handle = register(pact()).unwrap();
        let interaction = open_interaction(handle, InteractionKind::Http, "a request").unwrap();
        with_entry(handle, |entry| entry.mock_server_port = Some(1234)).unwrap();
        assert!(matches!(
            with_interaction(interaction, |_| ()),
            Err(FfiError::MockServerStarted(1234))
        ));
        release(handle);
    }
}
