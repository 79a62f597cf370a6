//! NativeCallResult: what a boundary call returns

use crate::error::{AbiResult, NativeError};
use crate::handle::Handle;
use crate::operation::OperationId;
use crate::value::NativeValue;

/// Result of a native call
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCallResult {
    /// Call returned a primitive or string value
    Value(NativeValue),
    /// Call returned an address (constructors, composite reads, mutations)
    Handle(Handle),
    /// Call returned nothing
    Void,
    /// Native side reported a fault
    Error(String),
}

impl NativeCallResult {
    /// Create a successful result with an i32 value
    #[inline]
    pub fn int(val: i32) -> Self {
        Self::Value(NativeValue::int(val))
    }

    /// Create a successful result with an f64 value
    #[inline]
    pub fn double(val: f64) -> Self {
        Self::Value(NativeValue::double(val))
    }

    /// Create a successful result with a bool value
    #[inline]
    pub fn bool(val: bool) -> Self {
        Self::Value(NativeValue::bool(val))
    }

    /// Create an error result
    #[inline]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Build from a fallible native-side computation
    pub fn from_result<T, E: ToString>(
        result: Result<T, E>,
        ok: impl FnOnce(T) -> NativeCallResult,
    ) -> Self {
        match result {
            Ok(value) => ok(value),
            Err(error) => Self::Error(error.to_string()),
        }
    }

    /// Expect a value result; void becomes `NativeValue::void()`
    pub fn into_value(self, op: &OperationId<'_>) -> AbiResult<NativeValue> {
        match self {
            NativeCallResult::Value(value) => Ok(value),
            NativeCallResult::Handle(handle) => Ok(NativeValue::handle(handle)),
            NativeCallResult::Void => Ok(NativeValue::void()),
            NativeCallResult::Error(message) => Err(NativeError::call_failure(op, message)),
        }
    }

    /// Expect a live handle result
    pub fn into_handle(self, op: &OperationId<'_>) -> AbiResult<Handle> {
        let handle = match self {
            NativeCallResult::Handle(handle) => handle,
            NativeCallResult::Value(value) => match value.as_handle() {
                Some(handle) => handle,
                None => {
                    return Err(NativeError::call_failure(
                        op,
                        format!("expected a handle, native side returned {}", value.type_name()),
                    ))
                }
            },
            NativeCallResult::Error(message) => return Err(NativeError::call_failure(op, message)),
            NativeCallResult::Void => {
                return Err(NativeError::call_failure(
                    op,
                    "expected a handle, native side returned void",
                ))
            }
        };
        if !handle.is_live() {
            return Err(NativeError::call_failure(
                op,
                format!("native side returned unusable handle {handle:?}"),
            ));
        }
        Ok(handle)
    }

    /// Expect a void result
    pub fn into_void(self, op: &OperationId<'_>) -> AbiResult<()> {
        match self {
            NativeCallResult::Error(message) => Err(NativeError::call_failure(op, message)),
            // Values are ignored for void calls.
            _ => Ok(()),
        }
    }
}
