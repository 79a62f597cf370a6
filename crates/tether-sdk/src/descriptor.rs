//! Kind descriptors: static type information for proxy kinds
//!
//! A handle carries no type. Every place that needs one (field access,
//! generic reconstruction, the native side's layout) is handed a
//! `KindDescriptor` explicitly. Descriptors are `'static` and built in const
//! context, normally by the `proxy_kind!` macro.

use crate::error::{AbiResult, NativeError};
use crate::value::ValueKind;

/// How a field is stored in its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRepr {
    /// Primitive or string value
    Value(ValueKind),
    /// Composite value in separately allocated storage the owner points to
    Boxed(&'static str),
    /// Composite value embedded in the owner at a fixed byte offset
    Inline {
        /// Kind id of the embedded value
        kind: &'static str,
        /// Byte offset from the owner's address
        offset: u64,
    },
}

impl FieldRepr {
    /// Check for boxed or inline composites
    pub const fn is_composite(&self) -> bool {
        !matches!(self, FieldRepr::Value(_))
    }

    /// Kind id of a composite field
    pub const fn kind_id(&self) -> Option<&'static str> {
        match self {
            FieldRepr::Value(_) => None,
            FieldRepr::Boxed(kind) => Some(kind),
            FieldRepr::Inline { kind, .. } => Some(kind),
        }
    }

    /// Human readable type for diagnostics
    pub fn type_name(&self) -> String {
        match self {
            FieldRepr::Value(kind) => kind.name().to_string(),
            FieldRepr::Boxed(kind) => format!("boxed {kind}"),
            FieldRepr::Inline { kind, offset } => format!("inline {kind} @ {offset:#x}"),
        }
    }
}

/// One declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name as used in operation ids
    pub name: &'static str,
    /// Storage representation
    pub repr: FieldRepr,
}

/// Static description of a proxy kind
#[derive(Debug, PartialEq, Eq)]
pub struct KindDescriptor {
    /// Stable identifier, also reported by `NativeBoundary::runtime_kind`
    pub id: &'static str,
    /// Declared fields in layout order
    pub fields: &'static [FieldDescriptor],
}

impl KindDescriptor {
    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field index by name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Look up a field, failing with `UnknownField`
    pub fn require_field(&self, name: &str) -> AbiResult<&'static FieldDescriptor> {
        self.field(name).ok_or_else(|| NativeError::UnknownField {
            kind: self.id.to_string(),
            field: name.to_string(),
        })
    }

    /// Get field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> {
        self.fields.iter().map(|f| f.name)
    }

    /// Iterate boxed and inline fields
    pub fn composite_fields(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().filter(|f| f.repr.is_composite())
    }

    /// Get number of fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Check names are unique and inline offsets are usable.
    ///
    /// An inline offset of zero would give the embedded value the owner's own
    /// address, so offsets must fall in `1..stride`.
    pub fn validate(&self, stride: u64) -> AbiResult<()> {
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(NativeError::AbiError(format!(
                    "Kind '{}' declares field '{}' twice",
                    self.id, field.name
                )));
            }
            if let FieldRepr::Inline { offset, .. } = field.repr {
                if offset == 0 || offset >= stride {
                    return Err(NativeError::AbiError(format!(
                        "Kind '{}' field '{}': inline offset {:#x} outside 1..{:#x}",
                        self.id, field.name, offset, stride
                    )));
                }
            }
        }
        Ok(())
    }
}
