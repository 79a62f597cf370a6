//! Generic object reconstruction
//!
//! A raw handle says nothing about what it points to. Reconstruction pairs
//! it with a caller-supplied descriptor and asks the native side for the
//! runtime kind before a proxy is built.

use tether_sdk::{AbiResult, Handle, KindDescriptor, NativeBoundary, NativeError};

/// Check that `handle` denotes a live value of `descriptor`'s kind
pub fn check_kind(
    boundary: &dyn NativeBoundary,
    handle: Handle,
    descriptor: &KindDescriptor,
) -> AbiResult<()> {
    if handle.is_null() {
        return Err(NativeError::NullHandle {
            operation: format!("reconstruct {}", descriptor.id),
        });
    }
    if handle.is_poisoned() {
        return Err(NativeError::UseAfterRelease {
            kind: descriptor.id.to_string(),
        });
    }

    let actual = boundary.runtime_kind(handle)?;
    if actual != descriptor.id {
        return Err(NativeError::mismatch(descriptor.id, actual));
    }
    Ok(())
}
