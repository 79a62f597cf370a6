//! NativeValue: tagged wire representation
//!
//! Every argument and primitive result crosses the boundary as a
//! `NativeValue`: one tag byte plus a 64-bit payload.
//!
//! # Encoding
//!
//! ```text
//! tag  kind     payload
//! 0    void     0
//! 1    bool     0 / 1
//! 2    byte     i8 sign-extended
//! 3    char     Unicode scalar value
//! 4    short    i16 sign-extended
//! 5    int      i32 sign-extended
//! 6    long     i64 bits
//! 7    float    f32::to_bits
//! 8    double   f64::to_bits
//! 9    string   id of a native-owned string (see NativeBoundary::create_string)
//! 10   handle   native address
//! ```
//!
//! The payload is a full 64 bits so `i64::MIN`/`i64::MAX` survive unchanged.

use crate::handle::Handle;

/// Kind of a wire value, also used as the declared type of primitive fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    /// No value
    Void = 0,
    /// `bool`
    Bool = 1,
    /// `i8`
    Byte = 2,
    /// `char`
    Char = 3,
    /// `i16`
    Short = 4,
    /// `i32`
    Int = 5,
    /// `i64`
    Long = 6,
    /// `f32`
    Float = 7,
    /// `f64`
    Double = 8,
    /// Native-owned string
    String = 9,
    /// Composite value address
    Handle = 10,
}

impl ValueKind {
    /// Decode a tag byte
    pub const fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => ValueKind::Void,
            1 => ValueKind::Bool,
            2 => ValueKind::Byte,
            3 => ValueKind::Char,
            4 => ValueKind::Short,
            5 => ValueKind::Int,
            6 => ValueKind::Long,
            7 => ValueKind::Float,
            8 => ValueKind::Double,
            9 => ValueKind::String,
            10 => ValueKind::Handle,
            _ => return None,
        })
    }

    /// Type name for diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::Void => "void",
            ValueKind::Bool => "bool",
            ValueKind::Byte => "byte",
            ValueKind::Char => "char",
            ValueKind::Short => "short",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Handle => "handle",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Tagged value passed across the boundary.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct NativeValue {
    tag: u8,
    data: u64,
}

impl NativeValue {
    /// Create a void value
    #[inline]
    pub const fn void() -> Self {
        Self::raw(ValueKind::Void, 0)
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Self::raw(ValueKind::Bool, b as u64)
    }

    /// Create a byte value
    #[inline]
    pub const fn byte(b: i8) -> Self {
        Self::raw(ValueKind::Byte, b as i64 as u64)
    }

    /// Create a char value
    #[inline]
    pub const fn char(c: char) -> Self {
        Self::raw(ValueKind::Char, c as u32 as u64)
    }

    /// Create a 16-bit integer value
    #[inline]
    pub const fn short(i: i16) -> Self {
        Self::raw(ValueKind::Short, i as i64 as u64)
    }

    /// Create a 32-bit integer value
    #[inline]
    pub const fn int(i: i32) -> Self {
        Self::raw(ValueKind::Int, i as i64 as u64)
    }

    /// Create a 64-bit integer value
    #[inline]
    pub const fn long(i: i64) -> Self {
        Self::raw(ValueKind::Long, i as u64)
    }

    /// Create a 32-bit float value
    #[inline]
    pub fn float(f: f32) -> Self {
        Self::raw(ValueKind::Float, f.to_bits() as u64)
    }

    /// Create a 64-bit float value
    #[inline]
    pub fn double(f: f64) -> Self {
        Self::raw(ValueKind::Double, f.to_bits())
    }

    /// Wrap the id of a string owned by the native side
    #[inline]
    pub const fn string_id(id: u64) -> Self {
        Self::raw(ValueKind::String, id)
    }

    /// Create a composite value from its handle
    #[inline]
    pub const fn handle(handle: Handle) -> Self {
        Self::raw(ValueKind::Handle, handle.to_raw())
    }

    #[inline]
    const fn raw(kind: ValueKind, data: u64) -> Self {
        Self {
            tag: kind as u8,
            data,
        }
    }

    /// Rebuild from a raw tag and payload, rejecting unknown tags
    pub const fn from_parts(tag: u8, data: u64) -> Option<Self> {
        match ValueKind::from_tag(tag) {
            Some(_) => Some(Self { tag, data }),
            None => None,
        }
    }

    /// Split into raw tag and payload
    pub const fn to_parts(self) -> (u8, u64) {
        (self.tag, self.data)
    }

    // ========================================================================
    // Extractors
    // ========================================================================

    /// Get the value kind
    pub fn kind(&self) -> ValueKind {
        // Constructors only ever produce known tags.
        ValueKind::from_tag(self.tag).unwrap_or(ValueKind::Void)
    }

    /// Check if this is void
    pub fn is_void(&self) -> bool {
        self.tag == ValueKind::Void as u8
    }

    fn payload(&self, kind: ValueKind) -> Option<u64> {
        if self.tag == kind as u8 {
            Some(self.data)
        } else {
            None
        }
    }

    /// Get as boolean if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        self.payload(ValueKind::Bool).map(|d| d != 0)
    }

    /// Get as i8 if this is a byte
    pub fn as_byte(&self) -> Option<i8> {
        self.payload(ValueKind::Byte).map(|d| d as i8)
    }

    /// Get as char if this is a valid char
    pub fn as_char(&self) -> Option<char> {
        self.payload(ValueKind::Char)
            .and_then(|d| u32::try_from(d).ok())
            .and_then(char::from_u32)
    }

    /// Get as i16 if this is a short
    pub fn as_short(&self) -> Option<i16> {
        self.payload(ValueKind::Short).map(|d| d as i16)
    }

    /// Get as i32 if this is an int
    pub fn as_int(&self) -> Option<i32> {
        self.payload(ValueKind::Int).map(|d| d as i32)
    }

    /// Get as i64 if this is a long
    pub fn as_long(&self) -> Option<i64> {
        self.payload(ValueKind::Long).map(|d| d as i64)
    }

    /// Get as f32 if this is a float
    pub fn as_float(&self) -> Option<f32> {
        self.payload(ValueKind::Float).map(|d| f32::from_bits(d as u32))
    }

    /// Get as f64 if this is a double
    pub fn as_double(&self) -> Option<f64> {
        self.payload(ValueKind::Double).map(f64::from_bits)
    }

    /// Get the native string id if this is a string
    pub fn as_string_id(&self) -> Option<u64> {
        self.payload(ValueKind::String)
    }

    /// Get the handle if this is a composite value
    pub fn as_handle(&self) -> Option<Handle> {
        self.payload(ValueKind::Handle).map(Handle::from_raw)
    }

    /// Get type name for debugging
    pub fn type_name(&self) -> &'static str {
        match ValueKind::from_tag(self.tag) {
            Some(kind) => kind.name(),
            None => "unknown",
        }
    }
}

impl Default for NativeValue {
    fn default() -> Self {
        Self::void()
    }
}

impl std::fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match ValueKind::from_tag(self.tag) {
            Some(ValueKind::Void) => write!(f, "NativeValue::Void"),
            Some(ValueKind::Bool) => write!(f, "NativeValue::Bool({})", self.data != 0),
            Some(ValueKind::Byte) => write!(f, "NativeValue::Byte({})", self.data as i8),
            Some(ValueKind::Char) => write!(f, "NativeValue::Char({:?})", self.as_char()),
            Some(ValueKind::Short) => write!(f, "NativeValue::Short({})", self.data as i16),
            Some(ValueKind::Int) => write!(f, "NativeValue::Int({})", self.data as i32),
            Some(ValueKind::Long) => write!(f, "NativeValue::Long({})", self.data as i64),
            Some(ValueKind::Float) => {
                write!(f, "NativeValue::Float({})", f32::from_bits(self.data as u32))
            }
            Some(ValueKind::Double) => write!(f, "NativeValue::Double({})", f64::from_bits(self.data)),
            Some(ValueKind::String) => write!(f, "NativeValue::String(#{})", self.data),
            Some(ValueKind::Handle) => write!(f, "NativeValue::Handle({:#x})", self.data),
            None => write!(f, "NativeValue::Unknown(tag={}, data={})", self.tag, self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_void() {
        let v = NativeValue::void();
        assert!(v.is_void());
        assert_eq!(v.kind(), ValueKind::Void);
        assert_eq!(v.as_int(), None);
    }

    #[test]
    fn test_integers_keep_sign() {
        assert_eq!(NativeValue::byte(-1).as_byte(), Some(-1));
        assert_eq!(NativeValue::short(i16::MIN).as_short(), Some(i16::MIN));
        assert_eq!(NativeValue::int(-100).as_int(), Some(-100));
        assert_eq!(NativeValue::long(i64::MIN).as_long(), Some(i64::MIN));
        assert_eq!(NativeValue::long(i64::MAX).as_long(), Some(i64::MAX));
    }

    #[test]
    fn test_floats() {
        assert_eq!(NativeValue::float(-0.5).as_float(), Some(-0.5));
        assert_eq!(NativeValue::double(f64::MAX).as_double(), Some(f64::MAX));
    }

    #[test]
    fn test_type_discrimination() {
        let i = NativeValue::int(1);
        assert_eq!(i.as_long(), None);
        assert_eq!(i.as_double(), None);
        assert_eq!(NativeValue::long(1).as_int(), None);
        assert_eq!(NativeValue::handle(Handle::from_raw(8)).as_handle(), Some(Handle::from_raw(8)));
        assert_eq!(NativeValue::string_id(3).as_handle(), None);
    }

    #[test]
    fn test_parts() {
        let v = NativeValue::char('λ');
        let (tag, data) = v.to_parts();
        assert_eq!(NativeValue::from_parts(tag, data), Some(v));
        assert_eq!(NativeValue::from_parts(200, 0), None);
    }

    #[test]
    fn test_invalid_char_payload() {
        let v = NativeValue::from_parts(ValueKind::Char as u8, 0xD800).unwrap();
        assert_eq!(v.as_char(), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", NativeValue::int(42)), "NativeValue::Int(42)");
        assert_eq!(
            format!("{:?}", NativeValue::handle(Handle::from_raw(0x10))),
            "NativeValue::Handle(0x10)"
        );
    }
}
