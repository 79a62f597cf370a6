//! Proxy kinds and the field-update hook

use tether_sdk::{Handle, KindDescriptor};

use crate::owner::FieldSlots;

/// Outcome of a field-update hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    /// The field's handle was recorded; the owner's own handle is unchanged
    Installed,
    /// The field is embedded in the owner, which therefore lives at a new handle
    Relocated(Handle),
    /// The owner has no composite field of that name
    Unknown,
}

/// Field-update hook signature, stored per proxy
pub type FieldHook = fn(&mut FieldSlots, &str, Handle) -> FieldUpdate;

/// A proxy kind: static type information plus the closed field-update dispatch.
///
/// Implemented by marker types, normally through [`proxy_kind!`](crate::proxy_kind).
///
/// `update_field` runs while the owner is being notified of a nested
/// proxy's new handle. It must only record state locally and never call
/// into the native side.
pub trait ProxyKind: 'static {
    /// Descriptor shared by every proxy of this kind
    const DESCRIPTOR: &'static KindDescriptor;

    /// Install `handle` as the new handle of composite field `field`
    fn update_field(slots: &mut FieldSlots, field: &str, handle: Handle) -> FieldUpdate;
}
