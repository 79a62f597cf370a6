//! Tether Heap - in-process native side
//!
//! A handle-addressed store that speaks the [`NativeBoundary`] protocol.
//! It backs the `tether` demo binary and the binding layer's tests.
//!
//! Writes can run in place or relocate the written block (see
//! [`HeapConfig::relocate_on_write`]). Relocation is what exercises
//! mutation propagation: every mutating call answers with a new handle.
//!
//! [`NativeBoundary`]: tether_sdk::NativeBoundary

#![warn(missing_docs)]

pub mod boundary;
pub mod config;
pub mod heap;
pub mod methods;

pub use boundary::HeapBoundary;
pub use config::HeapConfig;
pub use heap::{Heap, HeapError, HeapResult, Scalar};
pub use methods::{MethodFn, MethodRegistry};
