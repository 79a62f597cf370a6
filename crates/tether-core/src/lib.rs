//! Tether Core - proxy runtime
//!
//! Managed proxies for values that live on a native side reached through a
//! [`NativeBoundary`]. A proxy holds one [`Handle`]. Every mutation answers
//! with a possibly different handle, which the proxy installs and then
//! propagates to the proxies it was read from, so re-reading through the
//! root always sees the latest value.
//!
//! # Example
//!
//! ```ignore
//! use tether_core::{proxy_kind, Runtime};
//!
//! proxy_kind! {
//!     pub kind MyStruct("docs.MyStruct"): MyStructExt {
//!         a: value String { get_a, set_a },
//!     }
//! }
//!
//! proxy_kind! {
//!     pub kind MyOtherStruct("docs.MyOtherStruct"): MyOtherStructExt {
//!         b: boxed MyStruct { get_b, set_b },
//!     }
//! }
//!
//! let runtime = Runtime::new(boundary);
//! let mut root = runtime.construct::<MyOtherStruct>()?;
//! root.get_b()?.set_a("world!")?;
//! assert_eq!(root.get_b()?.get_a()?, "world!");
//! root.release()?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod kind;
pub mod macros;
pub mod owner;
mod propagate;
pub mod proxy;
pub mod reconstruct;
pub mod runtime;

pub use config::{BindingConfig, ConfigError};
pub use kind::{FieldHook, FieldUpdate, ProxyKind};
pub use owner::FieldSlots;
pub use proxy::{Nested, Owned, Proxy};
pub use runtime::Runtime;

pub use tether_sdk::{
    AbiResult, FieldDescriptor, FieldRepr, FromNative, Handle, KindDescriptor, NativeBoundary,
    NativeError, NativeType, NativeValue, ToNative, ValueKind,
};
