//! Operation ids: the `operation_id` half of `invoke(handle, operation_id, args)`
//!
//! An id names the kind it belongs to and what to do. Its display form is the
//! symbol the native side registers, e.g. `docs.MyStruct::set_a`.

use std::fmt;

/// What a native call does to its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation<'a> {
    /// Allocate storage with the named constructor (no receiver)
    Construct(&'a str),
    /// Free a root allocation
    Release,
    /// Read a field
    Get(&'a str),
    /// Replace a field, returning the receiver's new handle
    Set(&'a str),
    /// Call a method that leaves the receiver untouched
    Call(&'a str),
    /// Call a method that returns the receiver's new handle
    CallMut(&'a str),
}

impl Operation<'_> {
    /// True when the native side answers with a replacement handle for the receiver
    pub fn is_mutating(&self) -> bool {
        matches!(self, Operation::Set(_) | Operation::CallMut(_))
    }

    /// True when the receiver handle is dereferenced
    pub fn needs_receiver(&self) -> bool {
        !matches!(self, Operation::Construct(_))
    }
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Construct(name) => write!(f, "init_{name}"),
            Operation::Release => write!(f, "free"),
            Operation::Get(field) => write!(f, "get_{field}"),
            Operation::Set(field) => write!(f, "set_{field}"),
            Operation::Call(method) => write!(f, "call_{method}"),
            Operation::CallMut(method) => write!(f, "mut_{method}"),
        }
    }
}

/// Fully qualified operation id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationId<'a> {
    /// Kind id of the receiver (or of the value being constructed)
    pub kind: &'a str,
    /// Operation on that kind
    pub op: Operation<'a>,
}

impl<'a> OperationId<'a> {
    /// Create an operation id
    pub const fn new(kind: &'a str, op: Operation<'a>) -> Self {
        Self { kind, op }
    }
}

impl fmt::Display for OperationId<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.kind, self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        let kind = "docs.MyStruct";
        assert_eq!(OperationId::new(kind, Operation::Construct("new")).to_string(), "docs.MyStruct::init_new");
        assert_eq!(OperationId::new(kind, Operation::Release).to_string(), "docs.MyStruct::free");
        assert_eq!(OperationId::new(kind, Operation::Get("a")).to_string(), "docs.MyStruct::get_a");
        assert_eq!(OperationId::new(kind, Operation::Set("a")).to_string(), "docs.MyStruct::set_a");
        assert_eq!(OperationId::new(kind, Operation::Call("say")).to_string(), "docs.MyStruct::call_say");
        assert_eq!(OperationId::new(kind, Operation::CallMut("reset")).to_string(), "docs.MyStruct::mut_reset");
    }

    #[test]
    fn test_classification() {
        assert!(Operation::Set("a").is_mutating());
        assert!(Operation::CallMut("reset").is_mutating());
        assert!(!Operation::Get("a").is_mutating());
        assert!(!Operation::Release.is_mutating());
        assert!(!Operation::Construct("new").needs_receiver());
        assert!(Operation::Release.needs_receiver());
    }
}
