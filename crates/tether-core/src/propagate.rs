//! Propagation of a changed handle up the owner chain
//!
//! After a nested proxy installs a new handle, each owner is told through
//! its field-update hook. The walk continues only while owners move:
//!
//! - boxed field: the owner records the child handle and stays put
//! - inline field: the owner now lives at `child - offset` and tells its own owner
//! - unknown field, released owner or stale child: nothing happens
//!
//! A child is stale when its owner no longer sits at the handle the child
//! was read from, or when the owner has recorded a different handle for the
//! field than the one the child held before its mutation. Either means a
//! sibling or the owner itself was written since. Such a child is a
//! snapshot; its changes never reach the owner.
//!
//! No step calls into the native side.

use std::cell::RefCell;
use std::rc::Rc;

use tether_sdk::Handle;

use crate::kind::FieldUpdate;
use crate::proxy::ProxyState;

/// Push the current handle of `start` to its owners. `previous` is the
/// handle `start` held before its mutation. Returns the number of owners
/// notified.
pub(crate) fn propagate(
    start: &Rc<RefCell<ProxyState>>,
    previous: Handle,
    max_depth: usize,
) -> usize {
    let mut node = Rc::clone(start);
    let mut previous = previous;
    let mut hops = 0;

    loop {
        let (link, handle) = {
            let state = node.borrow();
            match &state.owner {
                Some(link) => (link.clone(), state.handle),
                None => break,
            }
        };

        if hops >= max_depth {
            log::warn!(
                "propagation stopped after {} hop(s) at field '{}'",
                hops,
                link.field
            );
            break;
        }

        let mut guard = link.owner.borrow_mut();
        let owner = &mut *guard;
        if owner.released() {
            log::debug!("owner of '{}' was released, nothing to update", link.field);
            break;
        }
        if owner.handle != link.read_from {
            log::debug!(
                "{}.{} was read at {:?}, owner is now {:?}; child is detached",
                owner.kind.id,
                link.field,
                link.read_from,
                owner.handle
            );
            break;
        }
        if owner.slots.get(link.field).is_some_and(|slot| slot != previous) {
            log::debug!(
                "{}.{} moved on from {:?}; child is detached",
                owner.kind.id,
                link.field,
                previous
            );
            break;
        }

        hops += 1;
        let hook = owner.hook;
        match hook(&mut owner.slots, link.field, handle) {
            FieldUpdate::Installed => {
                log::debug!("{}.{} <- {:?}", owner.kind.id, link.field, handle);
                break;
            }
            FieldUpdate::Relocated(moved) if moved == owner.handle => break,
            FieldUpdate::Relocated(moved) => {
                log::debug!(
                    "{}.{} <- {:?}, owner moved {:?} -> {:?}",
                    owner.kind.id,
                    link.field,
                    handle,
                    owner.handle,
                    moved
                );
                previous = owner.handle;
                owner.handle = moved;
                drop(guard);

                // The child now hangs off the moved owner.
                if let Some(own) = node.borrow_mut().owner.as_mut() {
                    own.read_from = moved;
                }
                node = Rc::clone(&link.owner);
            }
            FieldUpdate::Unknown => {
                log::warn!("{} has no composite field '{}'", owner.kind.id, link.field);
                break;
            }
        }
    }

    if hops > 0 {
        log::debug!("propagation finished after {} hop(s)", hops);
    }
    hops
}
