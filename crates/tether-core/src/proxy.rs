//! Proxies: managed stand-ins for native values
//!
//! [`Proxy`] carries every operation. It is reached through one of two
//! owning types:
//!
//! - [`Owned`]: a root proxy, created by construction, wrapping or
//!   reconstruction. Only roots can be released.
//! - [`Nested`]: a proxy materialized from a composite field of another
//!   proxy. It records its owner and field so handle changes propagate
//!   upward, and has no release operation.
//!
//! Nothing is cached: every field read yields a fresh proxy. Two nested
//! proxies read from the same field share a handle until one of them
//! mutates; from then on the other is a stale snapshot.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

use tether_sdk::{
    AbiResult, FieldRepr, FromNative, Handle, KindDescriptor, NativeError, NativeType,
    NativeValue, Operation, ToNative, ValueKind,
};

use crate::kind::{FieldHook, ProxyKind};
use crate::owner::{FieldSlots, OwnerLink};
use crate::propagate::propagate;
use crate::runtime::Runtime;

/// Mutable managed state of one proxy
pub(crate) struct ProxyState {
    pub(crate) handle: Handle,
    pub(crate) kind: &'static KindDescriptor,
    pub(crate) owner: Option<OwnerLink>,
    pub(crate) slots: FieldSlots,
    pub(crate) hook: FieldHook,
}

impl ProxyState {
    pub(crate) fn new<K: ProxyKind>(handle: Handle, owner: Option<OwnerLink>) -> Self {
        Self {
            handle,
            kind: K::DESCRIPTOR,
            owner,
            slots: FieldSlots::new(),
            hook: K::update_field,
        }
    }

    /// True when this proxy or any owner above it was released
    pub(crate) fn released(&self) -> bool {
        self.handle.is_poisoned()
            || self
                .owner
                .as_ref()
                .is_some_and(|link| link.owner.borrow().released())
    }
}

/// Typed proxy for a native value of kind `K`
pub struct Proxy<K: ProxyKind> {
    runtime: Runtime,
    state: Rc<RefCell<ProxyState>>,
    _kind: PhantomData<K>,
}

impl<K: ProxyKind> Proxy<K> {
    pub(crate) fn new(runtime: Runtime, handle: Handle, owner: Option<OwnerLink>) -> Self {
        Self {
            runtime,
            state: Rc::new(RefCell::new(ProxyState::new::<K>(handle, owner))),
            _kind: PhantomData,
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Current handle (poisoned after release)
    pub fn handle(&self) -> Handle {
        self.state.borrow().handle
    }

    /// Kind descriptor
    pub fn kind(&self) -> &'static KindDescriptor {
        K::DESCRIPTOR
    }

    /// Field this proxy was read from, `None` for roots
    pub fn owner_field(&self) -> Option<&'static str> {
        self.state.borrow().owner.as_ref().map(|link| link.field)
    }

    /// Check if this proxy has no owner
    pub fn is_root(&self) -> bool {
        self.state.borrow().owner.is_none()
    }

    /// Check if this proxy or one of its owners was released
    pub fn is_released(&self) -> bool {
        self.state.borrow().released()
    }

    /// Last handle recorded for a composite field, if one was read or updated
    pub fn field_slot(&self, field: &str) -> Option<Handle> {
        self.state.borrow().slots.get(field)
    }

    /// Get the runtime this proxy calls through
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    fn ensure_live(&self) -> AbiResult<Handle> {
        let state = self.state.borrow();
        if state.released() {
            return Err(NativeError::UseAfterRelease {
                kind: K::DESCRIPTOR.id.to_string(),
            });
        }
        Ok(state.handle)
    }

    // ========================================================================
    // Fields
    // ========================================================================

    fn value_field(&self, field: &str, expected: ValueKind) -> AbiResult<&'static str> {
        let descriptor = K::DESCRIPTOR.require_field(field)?;
        match descriptor.repr {
            FieldRepr::Value(kind) if kind == expected => Ok(descriptor.name),
            repr => Err(NativeError::mismatch(repr.type_name(), expected.name())),
        }
    }

    fn composite_field<C: ProxyKind>(&self, field: &str) -> AbiResult<&'static str> {
        let descriptor = K::DESCRIPTOR.require_field(field)?;
        match descriptor.repr.kind_id() {
            Some(id) if id == C::DESCRIPTOR.id => Ok(descriptor.name),
            _ => Err(NativeError::mismatch(
                descriptor.repr.type_name(),
                C::DESCRIPTOR.id,
            )),
        }
    }

    /// Read a primitive or string field
    pub fn get<T: FromNative + NativeType>(&self, field: &str) -> AbiResult<T> {
        let handle = self.ensure_live()?;
        let name = self.value_field(field, T::KIND)?;
        let value = self
            .runtime
            .invoke::<K>(handle, Operation::Get(name), &[])?;
        T::from_native(value, self.runtime.boundary())
    }

    /// Replace a primitive or string field.
    ///
    /// The native side answers with this value's new handle, which is
    /// installed and propagated to the owners. On failure nothing changes.
    pub fn set<V: ToNative + NativeType + ?Sized>(&self, field: &str, value: &V) -> AbiResult<()> {
        let handle = self.ensure_live()?;
        let name = self.value_field(field, V::KIND)?;
        let arg = value.to_native(self.runtime.boundary())?;
        self.mutate(handle, Operation::Set(name), &[arg])
    }

    /// Read a composite field as a nested proxy owned by this one
    pub fn nested<C: ProxyKind>(&self, field: &str) -> AbiResult<Nested<C>> {
        let handle = self.ensure_live()?;
        let name = self.composite_field::<C>(field)?;
        let child = self
            .runtime
            .invoke_handle::<K>(handle, Operation::Get(name), &[])?;
        self.state.borrow_mut().slots.record(name, child);

        let link = OwnerLink {
            owner: Rc::clone(&self.state),
            field: name,
            read_from: handle,
        };
        Ok(Nested {
            proxy: Proxy::new(self.runtime.clone(), child, Some(link)),
        })
    }

    /// Replace a composite field with a copy of another proxy's value
    pub fn set_nested<C: ProxyKind>(&self, field: &str, value: &Proxy<C>) -> AbiResult<()> {
        let handle = self.ensure_live()?;
        let source = value.ensure_live()?;
        let name = self.composite_field::<C>(field)?;
        self.mutate(handle, Operation::Set(name), &[NativeValue::handle(source)])?;
        self.state.borrow_mut().slots.clear(name);
        Ok(())
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Call a method that leaves this value untouched
    pub fn call<T: FromNative>(&self, method: &str, args: &[&dyn ToNative]) -> AbiResult<T> {
        let handle = self.ensure_live()?;
        let args = self.runtime.marshal(args)?;
        let value = self
            .runtime
            .invoke::<K>(handle, Operation::Call(method), &args)?;
        let boundary = self.runtime.boundary();
        T::from_native(value, boundary).inspect_err(|_| {
            // Unwanted native strings are still ours to free.
            if value.kind() == ValueKind::String {
                let _ = boundary.read_string(value);
            }
        })
    }

    /// Call a method that mutates this value and answers with its new handle
    pub fn call_mut(&self, method: &str, args: &[&dyn ToNative]) -> AbiResult<()> {
        let handle = self.ensure_live()?;
        let args = self.runtime.marshal(args)?;
        self.mutate(handle, Operation::CallMut(method), &args)
    }

    /// Call a method returning a composite value, reconstructed as kind `C`
    pub fn call_object<C: ProxyKind>(&self, method: &str, args: &[&dyn ToNative]) -> AbiResult<Owned<C>> {
        let handle = self.ensure_live()?;
        let args = self.runtime.marshal(args)?;
        let result = self
            .runtime
            .invoke_handle::<K>(handle, Operation::Call(method), &args)?;
        self.runtime.reconstruct::<C>(result)
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    fn mutate(&self, handle: Handle, op: Operation<'_>, args: &[NativeValue]) -> AbiResult<()> {
        let new_handle = self.runtime.invoke_handle::<K>(handle, op, args)?;
        self.state.borrow_mut().handle = new_handle;
        propagate(&self.state, handle, self.runtime.config().max_propagation_depth);
        Ok(())
    }

    /// Push this proxy's current handle to its owners.
    ///
    /// Runs after every mutation. Calling it directly is harmless: owners
    /// that were released are left alone and no native call is made.
    /// A proxy whose owner has moved on since it was read is a detached
    /// snapshot and notifies nobody. Returns the number of owners notified.
    pub fn propagate(&self) -> usize {
        let handle = self.handle();
        propagate(&self.state, handle, self.runtime.config().max_propagation_depth)
    }
}

impl<K: ProxyKind> fmt::Debug for Proxy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Proxy")
            .field("kind", &K::DESCRIPTOR.id)
            .field("handle", &state.handle)
            .field("owner", &state.owner)
            .finish()
    }
}

// ============================================================================
// Owned (root) proxies
// ============================================================================

/// A root proxy. Its native storage is freed by [`Owned::release`].
///
/// Dropping an `Owned` without releasing it leaves the native value alive.
pub struct Owned<K: ProxyKind> {
    proxy: Proxy<K>,
}

impl<K: ProxyKind> Owned<K> {
    pub(crate) fn new(runtime: Runtime, handle: Handle) -> Self {
        Self {
            proxy: Proxy::new(runtime, handle, None),
        }
    }

    /// Free the native value and everything nested in it.
    ///
    /// Afterwards this proxy and every proxy read from it reject all
    /// operations with `UseAfterRelease`. If the native side fails the
    /// proxy stays usable.
    pub fn release(&mut self) -> AbiResult<()> {
        let handle = self.proxy.ensure_live()?;
        self.proxy
            .runtime
            .invoke_void::<K>(handle, Operation::Release)?;
        self.proxy.state.borrow_mut().handle = Handle::POISON;
        log::debug!("released {} at {:?}", K::DESCRIPTOR.id, handle);
        Ok(())
    }
}

impl<K: ProxyKind> Deref for Owned<K> {
    type Target = Proxy<K>;

    fn deref(&self) -> &Proxy<K> {
        &self.proxy
    }
}

impl<K: ProxyKind> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.proxy).finish()
    }
}

// ============================================================================
// Nested proxies
// ============================================================================

/// A proxy read from a composite field of another proxy
pub struct Nested<K: ProxyKind> {
    proxy: Proxy<K>,
}

impl<K: ProxyKind> Deref for Nested<K> {
    type Target = Proxy<K>;

    fn deref(&self) -> &Proxy<K> {
        &self.proxy
    }
}

impl<K: ProxyKind> fmt::Debug for Nested<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Nested").field(&self.proxy).finish()
    }
}
