//! NativeBoundary trait: the consumed native call capability
//!
//! The binding layer programs against this trait only. How a call is
//! dispatched (symbol lookup, vtable, in-process heap) is up to the
//! implementor; loading the native artifact has already happened by the time
//! a boundary exists.

use std::rc::Rc;

use crate::error::{AbiResult, NativeError};
use crate::handle::Handle;
use crate::handler::NativeCallResult;
use crate::operation::OperationId;
use crate::value::NativeValue;

/// Abstract native side.
///
/// All methods take `&self`; the layer is single-threaded by contract, so
/// implementors typically keep their state in a `RefCell`.
pub trait NativeBoundary {
    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Perform one native operation.
    ///
    /// `handle` is [`Handle::NULL`] for constructors and live otherwise.
    /// String arguments are consumed by the callee.
    fn invoke(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult;

    // ========================================================================
    // Strings
    // ========================================================================

    /// Copy a string into native storage and return its wire value
    fn create_string(&self, s: &str) -> NativeValue;

    /// Take ownership of a native string, freeing its native storage
    fn read_string(&self, val: NativeValue) -> AbiResult<String>;

    // ========================================================================
    // Type information
    // ========================================================================

    /// Report the kind id of the value stored at `handle`
    fn runtime_kind(&self, handle: Handle) -> AbiResult<String>;
}

impl<B: NativeBoundary + ?Sized> NativeBoundary for Rc<B> {
    fn invoke(&self, handle: Handle, op: &OperationId<'_>, args: &[NativeValue]) -> NativeCallResult {
        (**self).invoke(handle, op, args)
    }

    fn create_string(&self, s: &str) -> NativeValue {
        (**self).create_string(s)
    }

    fn read_string(&self, val: NativeValue) -> AbiResult<String> {
        (**self).read_string(val)
    }

    fn runtime_kind(&self, handle: Handle) -> AbiResult<String> {
        (**self).runtime_kind(handle)
    }
}

/// A boundary with no native side: every call fails.
///
/// Useful for marshalling primitives, which never reach the native side.
pub struct NoopBoundary;

impl NativeBoundary for NoopBoundary {
    fn invoke(&self, _handle: Handle, op: &OperationId<'_>, _args: &[NativeValue]) -> NativeCallResult {
        NativeCallResult::Error(format!("no native side to handle {op}"))
    }

    fn create_string(&self, _s: &str) -> NativeValue {
        NativeValue::void()
    }

    fn read_string(&self, val: NativeValue) -> AbiResult<String> {
        Err(NativeError::mismatch("string", val.type_name()))
    }

    fn runtime_kind(&self, handle: Handle) -> AbiResult<String> {
        Err(NativeError::AbiError(format!("no native value at {handle}")))
    }
}
