//! Owner links and per-proxy field slots

use std::cell::RefCell;
use std::rc::Rc;

use tether_sdk::Handle;

use crate::proxy::ProxyState;

/// Link from a nested proxy to the proxy it was read from.
///
/// The link keeps the owner's managed state alive so that a chain built
/// from temporaries (`root.get_b()?.set_a(..)`) still reaches the root. It
/// never owns native storage; owners hold no links to their children, so
/// links cannot form cycles.
///
/// `read_from` is the owner handle the child was read at. Once the owner
/// has moved on without this child, the child is a detached snapshot and
/// its handle changes are no longer pushed up.
#[derive(Clone)]
pub(crate) struct OwnerLink {
    pub(crate) owner: Rc<RefCell<ProxyState>>,
    pub(crate) field: &'static str,
    pub(crate) read_from: Handle,
}

impl std::fmt::Debug for OwnerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handle = self.owner.try_borrow().map(|s| s.handle).ok();
        f.debug_struct("OwnerLink")
            .field("owner", &handle)
            .field("field", &self.field)
            .field("read_from", &self.read_from)
            .finish()
    }
}

/// Last known handles of an owner's composite fields.
///
/// Filled when a nested proxy is materialized and updated by the
/// field-update hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSlots {
    entries: Vec<(&'static str, Handle)>,
}

impl FieldSlots {
    /// Create empty slots
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the handle of `field`
    pub fn record(&mut self, field: &'static str, handle: Handle) {
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = handle,
            None => self.entries.push((field, handle)),
        }
    }

    /// Forget `field`, e.g. after the whole field was replaced
    pub fn clear(&mut self, field: &str) {
        self.entries.retain(|(name, _)| *name != field);
    }

    /// Get the last known handle of `field`
    pub fn get(&self, field: &str) -> Option<Handle> {
        self.entries
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, handle)| *handle)
    }

    /// Get number of recorded fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
