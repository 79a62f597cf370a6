//! Runtime: the entry point that binds proxies to a native boundary

use std::fmt;
use std::rc::Rc;

use tether_sdk::{
    marshal_args, AbiResult, Handle, KindDescriptor, NativeBoundary, NativeError, NativeValue,
    Operation, OperationId, ToNative,
};

use crate::config::BindingConfig;
use crate::kind::ProxyKind;
use crate::proxy::Owned;
use crate::reconstruct;

struct RuntimeInner {
    boundary: Box<dyn NativeBoundary>,
    config: BindingConfig,
}

/// Shared handle to a native boundary and the binding configuration.
///
/// Cheap to clone; every proxy keeps one.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new(boundary: impl NativeBoundary + 'static) -> Self {
        Self::with_config(boundary, BindingConfig::default())
    }

    /// Create a runtime with an explicit configuration
    pub fn with_config(boundary: impl NativeBoundary + 'static, config: BindingConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                boundary: Box::new(boundary),
                config,
            }),
        }
    }

    /// Get the native boundary
    pub fn boundary(&self) -> &dyn NativeBoundary {
        self.inner.boundary.as_ref()
    }

    /// Get the configuration
    pub fn config(&self) -> &BindingConfig {
        &self.inner.config
    }

    // ========================================================================
    // Roots
    // ========================================================================

    /// Allocate a default value of kind `K`
    pub fn construct<K: ProxyKind>(&self) -> AbiResult<Owned<K>> {
        self.construct_with::<K>("new", &[])
    }

    /// Allocate a value of kind `K` through a named native constructor
    pub fn construct_with<K: ProxyKind>(&self, name: &str, args: &[&dyn ToNative]) -> AbiResult<Owned<K>> {
        let args = self.marshal(args)?;
        let handle = self.invoke_handle::<K>(Handle::NULL, Operation::Construct(name), &args)?;
        log::debug!("constructed {} at {:?}", K::DESCRIPTOR.id, handle);
        Ok(Owned::new(self.clone(), handle))
    }

    /// Take over an externally supplied handle as a root proxy.
    ///
    /// The kind is only checked when `verify_wrapped_kinds` is set.
    pub fn wrap<K: ProxyKind>(&self, handle: Handle) -> AbiResult<Owned<K>> {
        if self.inner.config.verify_wrapped_kinds {
            return self.reconstruct::<K>(handle);
        }
        if handle.is_null() {
            return Err(NativeError::NullHandle {
                operation: format!("wrap {}", K::DESCRIPTOR.id),
            });
        }
        if handle.is_poisoned() {
            return Err(NativeError::UseAfterRelease {
                kind: K::DESCRIPTOR.id.to_string(),
            });
        }
        Ok(Owned::new(self.clone(), handle))
    }

    /// Build a root proxy from a raw handle after checking its runtime kind
    pub fn reconstruct<K: ProxyKind>(&self, handle: Handle) -> AbiResult<Owned<K>> {
        self.check_kind(handle, K::DESCRIPTOR)?;
        Ok(Owned::new(self.clone(), handle))
    }

    /// Check that `handle` holds a value of `descriptor`'s kind
    pub fn check_kind(&self, handle: Handle, descriptor: &KindDescriptor) -> AbiResult<()> {
        reconstruct::check_kind(self.boundary(), handle, descriptor)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Marshal arguments. Strings created before a failure are handed back
    /// to the native side.
    pub(crate) fn marshal(&self, args: &[&dyn ToNative]) -> AbiResult<Vec<NativeValue>> {
        marshal_args(args, self.boundary())
    }

    pub(crate) fn invoke<K: ProxyKind>(
        &self,
        handle: Handle,
        op: Operation<'_>,
        args: &[NativeValue],
    ) -> AbiResult<NativeValue> {
        let id = OperationId::new(K::DESCRIPTOR.id, op);
        self.boundary().invoke(handle, &id, args).into_value(&id)
    }

    pub(crate) fn invoke_void<K: ProxyKind>(&self, handle: Handle, op: Operation<'_>) -> AbiResult<()> {
        let id = OperationId::new(K::DESCRIPTOR.id, op);
        self.boundary().invoke(handle, &id, &[]).into_void(&id)
    }

    pub(crate) fn invoke_handle<K: ProxyKind>(
        &self,
        handle: Handle,
        op: Operation<'_>,
        args: &[NativeValue],
    ) -> AbiResult<Handle> {
        let id = OperationId::new(K::DESCRIPTOR.id, op);
        self.boundary().invoke(handle, &id, args).into_handle(&id)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
