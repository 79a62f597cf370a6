//! Value marshalling between Rust values and `NativeValue`
//!
//! Primitives convert without touching the native side. Strings live in
//! native storage, so both directions go through the boundary: `to_native`
//! allocates a native copy and `from_native` consumes it.

use crate::boundary::NativeBoundary;
use crate::error::{AbiResult, NativeError};
use crate::handle::Handle;
use crate::value::{NativeValue, ValueKind};

/// Rust types with a fixed wire kind.
pub trait NativeType {
    /// Wire kind of this type
    const KIND: ValueKind;
}

/// Convert from a Rust value to a `NativeValue`.
///
/// Implement this trait to allow a type to be passed as an argument.
pub trait ToNative {
    /// Convert to a wire value, allocating native storage if needed.
    fn to_native(&self, boundary: &dyn NativeBoundary) -> AbiResult<NativeValue>;
}

/// Convert from a `NativeValue` to a Rust value.
///
/// Implement this trait to allow a type to be received as a result.
pub trait FromNative: Sized {
    /// Convert from a wire value, returning an error if the kind doesn't match.
    fn from_native(value: NativeValue, boundary: &dyn NativeBoundary) -> AbiResult<Self>;
}

fn mismatch(expected: ValueKind, value: &NativeValue) -> NativeError {
    NativeError::mismatch(expected.name(), value.type_name())
}

macro_rules! primitive {
    ($ty:ty => $kind:ident: $ctor:ident / $getter:ident) => {
        impl NativeType for $ty {
            const KIND: ValueKind = ValueKind::$kind;
        }

        impl ToNative for $ty {
            fn to_native(&self, _boundary: &dyn NativeBoundary) -> AbiResult<NativeValue> {
                Ok(NativeValue::$ctor(*self))
            }
        }

        impl FromNative for $ty {
            fn from_native(value: NativeValue, _boundary: &dyn NativeBoundary) -> AbiResult<Self> {
                value.$getter().ok_or_else(|| mismatch(ValueKind::$kind, &value))
            }
        }
    };
}

primitive!(bool => Bool: bool / as_bool);
primitive!(i8 => Byte: byte / as_byte);
primitive!(char => Char: char / as_char);
primitive!(i16 => Short: short / as_short);
primitive!(i32 => Int: int / as_int);
primitive!(i64 => Long: long / as_long);
primitive!(f32 => Float: float / as_float);
primitive!(f64 => Double: double / as_double);
primitive!(Handle => Handle: handle / as_handle);

// ============================================================================
// Strings
// ============================================================================

impl NativeType for String {
    const KIND: ValueKind = ValueKind::String;
}

impl NativeType for str {
    const KIND: ValueKind = ValueKind::String;
}

impl ToNative for str {
    fn to_native(&self, boundary: &dyn NativeBoundary) -> AbiResult<NativeValue> {
        Ok(boundary.create_string(self))
    }
}

impl ToNative for String {
    fn to_native(&self, boundary: &dyn NativeBoundary) -> AbiResult<NativeValue> {
        self.as_str().to_native(boundary)
    }
}

impl FromNative for String {
    fn from_native(value: NativeValue, boundary: &dyn NativeBoundary) -> AbiResult<Self> {
        if value.kind() != ValueKind::String {
            return Err(mismatch(ValueKind::String, &value));
        }
        boundary.read_string(value)
    }
}

// ============================================================================
// Unit and references
// ============================================================================

// Unit type (for calls that return void)
impl NativeType for () {
    const KIND: ValueKind = ValueKind::Void;
}

impl FromNative for () {
    fn from_native(value: NativeValue, _boundary: &dyn NativeBoundary) -> AbiResult<Self> {
        if value.is_void() {
            Ok(())
        } else {
            Err(mismatch(ValueKind::Void, &value))
        }
    }
}

impl<T: ToNative + ?Sized> ToNative for &T {
    fn to_native(&self, boundary: &dyn NativeBoundary) -> AbiResult<NativeValue> {
        (**self).to_native(boundary)
    }
}

/// Marshal a slice of arguments, stopping at the first failure.
///
/// Strings already created for earlier arguments are handed back to the
/// native side before the error is returned.
pub fn marshal_args(
    args: &[&dyn ToNative],
    boundary: &dyn NativeBoundary,
) -> AbiResult<Vec<NativeValue>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg.to_native(boundary) {
            Ok(value) => values.push(value),
            Err(e) => {
                for value in values.into_iter().filter(|v| v.kind() == ValueKind::String) {
                    let _ = boundary.read_string(value);
                }
                return Err(e);
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::NoopBoundary;
    use crate::handler::NativeCallResult;
    use crate::operation::OperationId;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Minimal native side that only stores strings.
    #[derive(Default)]
    struct StringTable {
        next: RefCell<u64>,
        strings: RefCell<HashMap<u64, String>>,
    }

    impl NativeBoundary for StringTable {
        fn invoke(&self, _handle: Handle, op: &OperationId<'_>, _args: &[NativeValue]) -> NativeCallResult {
            NativeCallResult::Error(format!("{op} unsupported"))
        }

        fn create_string(&self, s: &str) -> NativeValue {
            let mut next = self.next.borrow_mut();
            *next += 1;
            self.strings.borrow_mut().insert(*next, s.to_string());
            NativeValue::string_id(*next)
        }

        fn read_string(&self, val: NativeValue) -> AbiResult<String> {
            let id = val.as_string_id().ok_or("not a string")?;
            self.strings
                .borrow_mut()
                .remove(&id)
                .ok_or_else(|| NativeError::AbiError(format!("no string #{id}")))
        }

        fn runtime_kind(&self, _handle: Handle) -> AbiResult<String> {
            Err("no values".into())
        }
    }

    fn round_trip<T: ToNative + FromNative>(value: T, boundary: &dyn NativeBoundary) -> T {
        let wire = value.to_native(boundary).unwrap();
        T::from_native(wire, boundary).unwrap()
    }

    #[test]
    fn test_integer_round_trips() {
        let b = NoopBoundary;
        for v in [0i8, -1, i8::MIN, i8::MAX] {
            assert_eq!(round_trip(v, &b), v);
        }
        for v in [0i16, -1, i16::MIN, i16::MAX] {
            assert_eq!(round_trip(v, &b), v);
        }
        for v in [0i32, -42, i32::MIN, i32::MAX] {
            assert_eq!(round_trip(v, &b), v);
        }
        for v in [0i64, -42, i64::MIN, i64::MAX] {
            assert_eq!(round_trip(v, &b), v);
        }
    }

    #[test]
    fn test_float_round_trips() {
        let b = NoopBoundary;
        for v in [0.0f32, -0.0, -1.5, f32::MIN, f32::MAX, f32::MIN_POSITIVE] {
            assert_eq!(round_trip(v, &b).to_bits(), v.to_bits());
        }
        for v in [0.0f64, -0.0, 3.25, f64::MIN, f64::MAX, f64::EPSILON] {
            assert_eq!(round_trip(v, &b).to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_bool_and_char_round_trips() {
        let b = NoopBoundary;
        assert!(round_trip(true, &b));
        assert!(!round_trip(false, &b));
        for c in ['\0', 'a', 'λ', char::MAX] {
            assert_eq!(round_trip(c, &b), c);
        }
    }

    #[test]
    fn test_string_round_trips() {
        let table = StringTable::default();
        for s in ["", "Hello, ", "world!", "ünïcødé ✓"] {
            assert_eq!(round_trip(s.to_string(), &table), s);
        }
        // Reading consumes the native copy.
        assert!(table.strings.borrow().is_empty());
    }

    #[test]
    fn test_mismatch() {
        let b = NoopBoundary;
        let err = i32::from_native(NativeValue::long(1), &b).unwrap_err();
        assert_eq!(err, NativeError::mismatch("int", "long"));
        assert!(String::from_native(NativeValue::int(1), &b).is_err());
        assert!(<()>::from_native(NativeValue::int(1), &b).is_err());
        assert!(<()>::from_native(NativeValue::void(), &b).is_ok());
    }

    #[test]
    fn test_marshal_args() {
        let table = StringTable::default();
        let name = "x";
        let args = marshal_args(&[&1i32, &name, &2.5f64], &table).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].as_int(), Some(1));
        assert_eq!(args[1].kind(), ValueKind::String);
        assert_eq!(args[2].as_double(), Some(2.5));
    }

    struct Refuses;

    impl ToNative for Refuses {
        fn to_native(&self, _boundary: &dyn NativeBoundary) -> AbiResult<NativeValue> {
            Err(NativeError::ArgumentError("refused".to_string()))
        }
    }

    #[test]
    fn test_marshal_args_returns_strings_on_failure() {
        let table = StringTable::default();
        let err = marshal_args(&[&"first", &7i32, &"second", &Refuses], &table).unwrap_err();
        assert_eq!(err, NativeError::ArgumentError("refused".to_string()));
        assert!(table.strings.borrow().is_empty());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(<String as NativeType>::KIND, ValueKind::String);
        assert_eq!(<i64 as NativeType>::KIND, ValueKind::Long);
        assert_eq!(<() as NativeType>::KIND, ValueKind::Void);
    }
}
