//! Handle-addressed heap
//!
//! Storage is organised in blocks. A root allocation and every boxed value
//! reachable from it share a *family* and are freed together. Inline values
//! live inside their owner's block at `owner + offset`.
//!
//! With `relocate_on_write` a write never touches the addressed block: the
//! block is copied to a fresh base with the change applied and the old
//! version stays readable until its family is released. Boxed references
//! held by current blocks are rebound to the new base, which is the
//! bookkeeping a real native owner does when it moves a value. Handles held
//! by the managed side are not rebound; that is the binding layer's job.

use rustc_hash::{FxHashMap, FxHashSet};

use tether_sdk::{FieldRepr, Handle, KindDescriptor, NativeValue, ValueKind};

use crate::config::HeapConfig;

/// Deepest chain of default-constructed nested values
const MAX_NESTING: usize = 32;

/// Heap errors, reported across the boundary as native call failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HeapError {
    /// Kind id was never registered
    #[error("unknown kind '{0}'")]
    UnknownKind(String),

    /// Address does not denote live storage
    #[error("dangling handle {0}")]
    Dangling(Handle),

    /// Receiver has a different kind than the operation expects
    #[error("kind mismatch: expected {expected}, found {found}")]
    KindMismatch {
        /// Kind named by the operation
        expected: String,
        /// Kind stored at the address
        found: String,
    },

    /// Field not declared by the kind
    #[error("kind '{kind}' has no field '{field}'")]
    UnknownField {
        /// Kind id
        kind: String,
        /// Field name
        field: String,
    },

    /// Written value does not fit the field
    #[error("field '{field}' expects {expected}, got {got}")]
    FieldType {
        /// Field name
        field: String,
        /// Declared type
        expected: String,
        /// Received wire type
        got: String,
    },

    /// Release through something other than the current root of a family
    #[error("{0} is not the current root of an allocation")]
    NotRoot(Handle),

    /// Kind layout rejected at registration or construction
    #[error("layout error: {0}")]
    Layout(String),

    /// String id not present in the string table
    #[error("no native string #{0}")]
    MissingString(u64),
}

/// Heap result type
pub type HeapResult<T> = Result<T, HeapError>;

// ============================================================================
// Stored values
// ============================================================================

/// A primitive or string stored in a field
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// `bool`
    Bool(bool),
    /// `i8`
    Byte(i8),
    /// `char`
    Char(char),
    /// `i16`
    Short(i16),
    /// `i32`
    Int(i32),
    /// `i64`
    Long(i64),
    /// `f32`
    Float(f32),
    /// `f64`
    Double(f64),
    /// Owned string
    Str(String),
}

impl Scalar {
    /// Zero value of a primitive kind
    pub fn default_for(kind: ValueKind) -> Option<Scalar> {
        Some(match kind {
            ValueKind::Bool => Scalar::Bool(false),
            ValueKind::Byte => Scalar::Byte(0),
            ValueKind::Char => Scalar::Char('\0'),
            ValueKind::Short => Scalar::Short(0),
            ValueKind::Int => Scalar::Int(0),
            ValueKind::Long => Scalar::Long(0),
            ValueKind::Float => Scalar::Float(0.0),
            ValueKind::Double => Scalar::Double(0.0),
            ValueKind::String => Scalar::Str(String::new()),
            ValueKind::Void | ValueKind::Handle => return None,
        })
    }

    /// Decode a wire value. `string` is the already consumed string payload.
    fn from_wire(value: NativeValue, string: Option<String>) -> Option<Scalar> {
        Some(match value.kind() {
            ValueKind::Bool => Scalar::Bool(value.as_bool()?),
            ValueKind::Byte => Scalar::Byte(value.as_byte()?),
            ValueKind::Char => Scalar::Char(value.as_char()?),
            ValueKind::Short => Scalar::Short(value.as_short()?),
            ValueKind::Int => Scalar::Int(value.as_int()?),
            ValueKind::Long => Scalar::Long(value.as_long()?),
            ValueKind::Float => Scalar::Float(value.as_float()?),
            ValueKind::Double => Scalar::Double(value.as_double()?),
            ValueKind::String => Scalar::Str(string?),
            ValueKind::Void | ValueKind::Handle => return None,
        })
    }

    /// Wire kind of this scalar
    pub fn kind(&self) -> ValueKind {
        match self {
            Scalar::Bool(_) => ValueKind::Bool,
            Scalar::Byte(_) => ValueKind::Byte,
            Scalar::Char(_) => ValueKind::Char,
            Scalar::Short(_) => ValueKind::Short,
            Scalar::Int(_) => ValueKind::Int,
            Scalar::Long(_) => ValueKind::Long,
            Scalar::Float(_) => ValueKind::Float,
            Scalar::Double(_) => ValueKind::Double,
            Scalar::Str(_) => ValueKind::String,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Byte(v) => write!(f, "{v}"),
            Scalar::Char(v) => write!(f, "{v:?}"),
            Scalar::Short(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Long(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Double(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Slot {
    Scalar(Scalar),
    Boxed(u64),
    Inline(Object),
}

#[derive(Debug, Clone)]
struct Object {
    kind: &'static KindDescriptor,
    slots: Vec<Slot>,
}

impl Object {
    fn descend(&self, path: &[usize]) -> Option<&Object> {
        path.iter().try_fold(self, |obj, &i| match obj.slots.get(i)? {
            Slot::Inline(inner) => Some(inner),
            _ => None,
        })
    }

    fn descend_mut(&mut self, path: &[usize]) -> Option<&mut Object> {
        path.iter().try_fold(self, |obj, &i| match obj.slots.get_mut(i)? {
            Slot::Inline(inner) => Some(inner),
            _ => None,
        })
    }

    fn rebind(&mut self, old: u64, new: u64) -> usize {
        let mut count = 0;
        for slot in &mut self.slots {
            match slot {
                Slot::Boxed(target) if *target == old => {
                    *target = new;
                    count += 1;
                }
                Slot::Inline(inner) => count += inner.rebind(old, new),
                _ => {}
            }
        }
        count
    }
}

struct Block {
    family: u64,
    object: Object,
    /// False once a newer version of this block exists
    current: bool,
}

#[derive(Debug, Clone)]
struct Location {
    base: u64,
    path: Vec<usize>,
}

// ============================================================================
// Heap
// ============================================================================

/// The in-process native side's storage.
pub struct Heap {
    config: HeapConfig,
    kinds: FxHashMap<&'static str, &'static KindDescriptor>,
    blocks: FxHashMap<u64, Block>,
    addresses: FxHashMap<u64, Location>,
    family_roots: FxHashMap<u64, u64>,
    strings: FxHashMap<u64, String>,
    next_block: u64,
    next_string: u64,
}

impl Heap {
    /// Create an empty heap
    pub fn new(config: HeapConfig) -> Self {
        let next_block = config.base_address;
        Self {
            config,
            kinds: FxHashMap::default(),
            blocks: FxHashMap::default(),
            addresses: FxHashMap::default(),
            family_roots: FxHashMap::default(),
            strings: FxHashMap::default(),
            next_block,
            next_string: 1,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Register a kind so it can be constructed and addressed
    pub fn register(&mut self, kind: &'static KindDescriptor) -> HeapResult<()> {
        kind.validate(self.config.block_stride)
            .map_err(|e| HeapError::Layout(e.to_string()))?;
        for field in kind.fields {
            if let FieldRepr::Value(value_kind) = field.repr {
                if Scalar::default_for(value_kind).is_none() {
                    return Err(HeapError::Layout(format!(
                        "kind '{}' field '{}' cannot store {}",
                        kind.id, field.name, value_kind
                    )));
                }
            }
        }
        self.kinds.insert(kind.id, kind);
        Ok(())
    }

    fn kind(&self, id: &str) -> HeapResult<&'static KindDescriptor> {
        self.kinds
            .get(id)
            .copied()
            .ok_or_else(|| HeapError::UnknownKind(id.to_string()))
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    fn alloc_base(&mut self) -> u64 {
        let base = self.next_block;
        self.next_block += self.config.block_stride;
        base
    }

    fn insert_block(&mut self, base: u64, family: u64, object: Object, current: bool) {
        self.register_addresses(base, base, &object, &mut Vec::new());
        self.blocks.insert(
            base,
            Block {
                family,
                object,
                current,
            },
        );
    }

    fn register_addresses(&mut self, base: u64, addr: u64, object: &Object, path: &mut Vec<usize>) {
        self.addresses.insert(
            addr,
            Location {
                base,
                path: path.clone(),
            },
        );
        for (i, field) in object.kind.fields.iter().enumerate() {
            if let (FieldRepr::Inline { offset, .. }, Some(Slot::Inline(inner))) =
                (field.repr, object.slots.get(i))
            {
                path.push(i);
                self.register_addresses(base, addr + offset, inner, path);
                path.pop();
            }
        }
    }

    fn default_object(
        &mut self,
        kind: &'static KindDescriptor,
        family: u64,
        depth: usize,
    ) -> HeapResult<Object> {
        if depth > MAX_NESTING {
            return Err(HeapError::Layout(format!(
                "kind '{}' nests deeper than {} levels",
                kind.id, MAX_NESTING
            )));
        }
        let mut slots = Vec::with_capacity(kind.fields.len());
        for field in kind.fields {
            let slot = match field.repr {
                FieldRepr::Value(value_kind) => Slot::Scalar(
                    Scalar::default_for(value_kind)
                        .ok_or_else(|| HeapError::Layout(format!("no default for {value_kind}")))?,
                ),
                FieldRepr::Boxed(child) => {
                    let child_kind = self.kind(child)?;
                    let base = self.alloc_base();
                    let object = self.default_object(child_kind, family, depth + 1)?;
                    self.insert_block(base, family, object, true);
                    Slot::Boxed(base)
                }
                FieldRepr::Inline { kind: child, .. } => {
                    let child_kind = self.kind(child)?;
                    Slot::Inline(self.default_object(child_kind, family, depth + 1)?)
                }
            };
            slots.push(slot);
        }
        Ok(Object { kind, slots })
    }

    /// Allocate a default value of `kind` as a new root allocation
    pub fn construct(&mut self, kind: &str) -> HeapResult<Handle> {
        let kind = self.kind(kind)?;
        let base = self.alloc_base();
        let object = match self.default_object(kind, base, 0) {
            Ok(object) => object,
            Err(e) => {
                self.drop_family(base);
                return Err(e);
            }
        };
        self.insert_block(base, base, object, true);
        self.family_roots.insert(base, base);
        log::debug!("heap: constructed {} at {:#x}", kind.id, base);
        Ok(Handle::from_raw(base))
    }

    /// Deep-copy the value at `handle` into a new root allocation
    pub fn copy_root(&mut self, handle: Handle) -> HeapResult<Handle> {
        let source = self.object(handle)?.clone();
        let base = self.alloc_base();
        let object = match self.adopt(source, base) {
            Ok(object) => object,
            Err(e) => {
                self.drop_family(base);
                return Err(e);
            }
        };
        self.insert_block(base, base, object, true);
        self.family_roots.insert(base, base);
        log::debug!("heap: copied {:?} to new root {:#x}", handle, base);
        Ok(Handle::from_raw(base))
    }

    /// Copy an object and every boxed value under it into `family`
    fn adopt(&mut self, mut object: Object, family: u64) -> HeapResult<Object> {
        for slot in &mut object.slots {
            match slot {
                Slot::Boxed(child) => {
                    let source = self
                        .blocks
                        .get(child)
                        .ok_or(HeapError::Dangling(Handle::from_raw(*child)))?
                        .object
                        .clone();
                    let copy = self.adopt(source, family)?;
                    let base = self.alloc_base();
                    self.insert_block(base, family, copy, true);
                    *child = base;
                }
                Slot::Inline(inner) => {
                    *inner = self.adopt(inner.clone(), family)?;
                }
                Slot::Scalar(_) => {}
            }
        }
        Ok(object)
    }

    /// Free a root allocation and everything in its family
    pub fn free(&mut self, handle: Handle) -> HeapResult<usize> {
        let location = self.locate(handle)?;
        let family = self
            .blocks
            .get(&location.base)
            .map(|b| b.family)
            .ok_or(HeapError::Dangling(handle))?;
        let is_root = location.path.is_empty()
            && self.family_roots.get(&family) == Some(&location.base);
        if !is_root {
            return Err(HeapError::NotRoot(handle));
        }

        let freed = self.drop_family(family);
        log::debug!("heap: freed {} block(s) of family {:#x}", freed, family);
        Ok(freed)
    }

    fn drop_family(&mut self, family: u64) -> usize {
        let freed: FxHashSet<u64> = self
            .blocks
            .iter()
            .filter(|(_, block)| block.family == family)
            .map(|(base, _)| *base)
            .collect();
        self.blocks.retain(|base, _| !freed.contains(base));
        self.addresses.retain(|_, loc| !freed.contains(&loc.base));
        self.family_roots.remove(&family);
        freed.len()
    }

    // ========================================================================
    // Addressing
    // ========================================================================

    fn locate(&self, handle: Handle) -> HeapResult<Location> {
        self.addresses
            .get(&handle.to_raw())
            .cloned()
            .ok_or(HeapError::Dangling(handle))
    }

    fn object(&self, handle: Handle) -> HeapResult<&Object> {
        let location = self.locate(handle)?;
        self.blocks
            .get(&location.base)
            .and_then(|block| block.object.descend(&location.path))
            .ok_or(HeapError::Dangling(handle))
    }

    fn typed_object(&self, handle: Handle, kind: &str) -> HeapResult<&Object> {
        let object = self.object(handle)?;
        if object.kind.id != kind {
            return Err(HeapError::KindMismatch {
                expected: kind.to_string(),
                found: object.kind.id.to_string(),
            });
        }
        Ok(object)
    }

    /// Kind id of the value at `handle`
    pub fn kind_of(&self, handle: Handle) -> HeapResult<&'static str> {
        self.object(handle).map(|o| o.kind.id)
    }

    /// Check whether `handle` addresses live storage
    pub fn is_live(&self, handle: Handle) -> bool {
        self.addresses.contains_key(&handle.to_raw())
    }

    // ========================================================================
    // Field access
    // ========================================================================

    fn field_index(object: &Object, field: &str) -> HeapResult<usize> {
        object
            .kind
            .field_index(field)
            .ok_or_else(|| HeapError::UnknownField {
                kind: object.kind.id.to_string(),
                field: field.to_string(),
            })
    }

    /// Read a field as a wire value. Strings are copied into the string table.
    pub fn read(&mut self, handle: Handle, kind: &str, field: &str) -> HeapResult<NativeValue> {
        let object = self.typed_object(handle, kind)?;
        let index = Self::field_index(object, field)?;
        let repr = object.kind.fields[index].repr;
        match (&object.slots[index], repr) {
            (Slot::Scalar(Scalar::Str(s)), _) => {
                let s = s.clone();
                Ok(self.create_string(&s))
            }
            (Slot::Scalar(scalar), _) => Ok(scalar_to_wire(scalar)),
            (Slot::Boxed(base), _) => Ok(NativeValue::handle(Handle::from_raw(*base))),
            (Slot::Inline(_), FieldRepr::Inline { offset, .. }) => {
                Ok(NativeValue::handle(handle.offset_by(offset)))
            }
            (Slot::Inline(_), _) => Err(HeapError::Layout(format!(
                "field '{field}' is stored inline without an offset"
            ))),
        }
    }

    /// Read a scalar field without going through the wire
    pub fn scalar(&self, handle: Handle, field: &str) -> HeapResult<Scalar> {
        let object = self.object(handle)?;
        let index = Self::field_index(object, field)?;
        match &object.slots[index] {
            Slot::Scalar(scalar) => Ok(scalar.clone()),
            _ => Err(HeapError::FieldType {
                field: field.to_string(),
                expected: "scalar".to_string(),
                got: object.kind.fields[index].repr.type_name(),
            }),
        }
    }

    /// Write a field, returning the receiver's (possibly new) handle.
    ///
    /// String arguments are consumed even when the write fails.
    pub fn write(
        &mut self,
        handle: Handle,
        kind: &str,
        field: &str,
        value: NativeValue,
    ) -> HeapResult<Handle> {
        let string = match value.as_string_id() {
            Some(id) => Some(self.take_string(id)?),
            None => None,
        };

        let object = self.typed_object(handle, kind)?;
        let index = Self::field_index(object, field)?;
        let repr = object.kind.fields[index].repr;
        let type_error = || HeapError::FieldType {
            field: field.to_string(),
            expected: repr.type_name(),
            got: value.type_name().to_string(),
        };

        let slot = match repr {
            FieldRepr::Value(expected) => {
                if value.kind() != expected {
                    return Err(type_error());
                }
                Slot::Scalar(Scalar::from_wire(value, string).ok_or_else(type_error)?)
            }
            FieldRepr::Boxed(child) | FieldRepr::Inline { kind: child, .. } => {
                let source = value.as_handle().ok_or_else(type_error)?;
                let source = self.typed_object(source, child)?.clone();
                let family = self.family_of(handle)?;
                let copy = self.adopt(source, family)?;
                if let FieldRepr::Boxed(_) = repr {
                    let base = self.alloc_base();
                    self.insert_block(base, family, copy, true);
                    Slot::Boxed(base)
                } else {
                    Slot::Inline(copy)
                }
            }
        };

        if self.config.relocate_on_write {
            self.write_relocating(handle, index, slot)
        } else {
            self.write_in_place(handle, index, slot)
        }
    }

    fn family_of(&self, handle: Handle) -> HeapResult<u64> {
        let location = self.locate(handle)?;
        self.blocks
            .get(&location.base)
            .map(|b| b.family)
            .ok_or(HeapError::Dangling(handle))
    }

    fn write_in_place(&mut self, handle: Handle, index: usize, slot: Slot) -> HeapResult<Handle> {
        let location = self.locate(handle)?;
        let reindex = matches!(slot, Slot::Inline(_));
        let block = self
            .blocks
            .get_mut(&location.base)
            .ok_or(HeapError::Dangling(handle))?;
        let object = block
            .object
            .descend_mut(&location.path)
            .ok_or(HeapError::Dangling(handle))?;
        object.slots[index] = slot;
        if reindex {
            let object = block.object.clone();
            self.register_addresses(location.base, location.base, &object, &mut Vec::new());
        }
        Ok(handle)
    }

    fn write_relocating(&mut self, handle: Handle, index: usize, slot: Slot) -> HeapResult<Handle> {
        let location = self.locate(handle)?;
        let (family, current, mut object) = {
            let block = self
                .blocks
                .get(&location.base)
                .ok_or(HeapError::Dangling(handle))?;
            (block.family, block.current, block.object.clone())
        };
        object
            .descend_mut(&location.path)
            .ok_or(HeapError::Dangling(handle))?
            .slots[index] = slot;

        let new_base = self.alloc_base();
        self.insert_block(new_base, family, object, current);

        if current {
            if let Some(old) = self.blocks.get_mut(&location.base) {
                old.current = false;
            }
            let rebound = self.rebind(location.base, new_base);
            if self.family_roots.get(&family) == Some(&location.base) {
                self.family_roots.insert(family, new_base);
            }
            log::trace!(
                "heap: moved block {:#x} -> {:#x}, rebound {} reference(s)",
                location.base,
                new_base,
                rebound
            );
        }

        let moved = handle.to_raw() - location.base;
        Ok(Handle::from_raw(new_base + moved))
    }

    fn rebind(&mut self, old: u64, new: u64) -> usize {
        self.blocks
            .values_mut()
            .filter(|block| block.current)
            .map(|block| block.object.rebind(old, new))
            .sum()
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// Copy a string into the string table
    pub fn create_string(&mut self, s: &str) -> NativeValue {
        let id = self.next_string;
        self.next_string += 1;
        self.strings.insert(id, s.to_string());
        NativeValue::string_id(id)
    }

    /// Remove a string from the string table
    pub fn take_string(&mut self, id: u64) -> HeapResult<String> {
        self.strings.remove(&id).ok_or(HeapError::MissingString(id))
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of blocks, current and superseded
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of live root allocations
    pub fn family_count(&self) -> usize {
        self.family_roots.len()
    }

    /// Number of strings not yet consumed
    pub fn pending_strings(&self) -> usize {
        self.strings.len()
    }

    /// Current root address of the family that `handle` belongs to
    pub fn current_root(&self, handle: Handle) -> HeapResult<Handle> {
        let family = self.family_of(handle)?;
        self.family_roots
            .get(&family)
            .map(|base| Handle::from_raw(*base))
            .ok_or(HeapError::Dangling(handle))
    }

    /// Render the value at `handle` as an indented tree
    pub fn dump(&self, handle: Handle) -> HeapResult<String> {
        let mut out = String::new();
        let object = self.object(handle)?;
        self.dump_object(object, handle.to_raw(), 0, &mut out);
        Ok(out)
    }

    fn dump_object(&self, object: &Object, addr: u64, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{pad}{} @ {:#x}\n", object.kind.id, addr));
        for (field, slot) in object.kind.fields.iter().zip(&object.slots) {
            match (slot, field.repr) {
                (Slot::Scalar(s), _) => out.push_str(&format!("{pad}  {} = {}\n", field.name, s)),
                (Slot::Boxed(base), _) => {
                    out.push_str(&format!("{pad}  {} ->\n", field.name));
                    match self.blocks.get(base) {
                        Some(block) => self.dump_object(&block.object, *base, depth + 2, out),
                        None => out.push_str(&format!("{pad}    <dangling {:#x}>\n", base)),
                    }
                }
                (Slot::Inline(inner), FieldRepr::Inline { offset, .. }) => {
                    out.push_str(&format!("{pad}  {} =\n", field.name));
                    self.dump_object(inner, addr + offset, depth + 2, out);
                }
                (Slot::Inline(_), _) => {}
            }
        }
    }
}

fn scalar_to_wire(scalar: &Scalar) -> NativeValue {
    match scalar {
        Scalar::Bool(v) => NativeValue::bool(*v),
        Scalar::Byte(v) => NativeValue::byte(*v),
        Scalar::Char(v) => NativeValue::char(*v),
        Scalar::Short(v) => NativeValue::short(*v),
        Scalar::Int(v) => NativeValue::int(*v),
        Scalar::Long(v) => NativeValue::long(*v),
        Scalar::Float(v) => NativeValue::float(*v),
        Scalar::Double(v) => NativeValue::double(*v),
        // Strings go through the string table.
        Scalar::Str(_) => NativeValue::void(),
    }
}
