//! Tether SDK - ABI vocabulary for native bindings
//!
//! This crate provides the types shared by both sides of a Tether binding
//! without depending on the proxy runtime:
//!
//! - [`Handle`]: opaque native address with null and poison sentinels
//! - [`NativeValue`]: tagged wire value for arguments and primitive results
//! - [`NativeBoundary`]: the consumed `invoke(handle, operation_id, args)` capability
//! - [`NativeCallResult`]: value / handle / void / error
//! - [`KindDescriptor`]: explicit type information for proxy kinds
//! - [`ToNative`] / [`FromNative`]: value marshalling
//!
//! # Example
//!
//! ```ignore
//! use tether_sdk::{FromNative, NativeBoundary, ToNative};
//!
//! fn echo(boundary: &dyn NativeBoundary, s: &str) -> tether_sdk::AbiResult<String> {
//!     let wire = s.to_native(boundary)?;
//!     String::from_native(wire, boundary)
//! }
//! ```

#![warn(missing_docs)]

pub mod boundary;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod handler;
pub mod operation;
pub mod value;

pub use boundary::{NativeBoundary, NoopBoundary};
pub use convert::{marshal_args, FromNative, NativeType, ToNative};
pub use descriptor::{FieldDescriptor, FieldRepr, KindDescriptor};
pub use error::{AbiResult, NativeError};
pub use handle::Handle;
pub use handler::NativeCallResult;
pub use operation::{Operation, OperationId};
pub use value::{NativeValue, ValueKind};
