//! `proxy_kind!`: declare a proxy kind
//!
//! ```ignore
//! tether_core::proxy_kind! {
//!     /// A point
//!     pub kind Point("geo.Point"): PointExt {
//!         x: value f64 { get_x, set_x },
//!         y: value f64 { get_y, set_y },
//!     }
//! }
//!
//! tether_core::proxy_kind! {
//!     pub kind Segment("geo.Segment"): SegmentExt {
//!         label: value String { get_label, set_label },
//!         from: inline Point = 0x10 { get_from, set_from },
//!         to: boxed Point { get_to, set_to },
//!     }
//! }
//! ```
//!
//! Each field is one of
//!
//! - `value T`: primitive or string, `T: NativeType`
//! - `boxed K`: composite stored behind a native pointer
//! - `inline K = OFFSET`: composite embedded at `OFFSET` bytes into the owner
//!
//! The macro emits a marker type implementing [`ProxyKind`](crate::ProxyKind)
//! (descriptor and field-update dispatch) and an extension trait with
//! typed accessors, implemented for [`Proxy`](crate::Proxy) of that kind.

/// Declare a proxy kind. See the [module docs](crate::macros).
#[macro_export]
macro_rules! proxy_kind {
    // ------------------------------------------------------------------------
    // Field representation
    // ------------------------------------------------------------------------
    (@repr value $ty:ty) => {
        $crate::FieldRepr::Value(<$ty as $crate::NativeType>::KIND)
    };
    (@repr boxed $ty:ty) => {
        $crate::FieldRepr::Boxed(<$ty as $crate::ProxyKind>::DESCRIPTOR.id)
    };
    (@repr inline $ty:ty, $offset:literal) => {
        $crate::FieldRepr::Inline {
            kind: <$ty as $crate::ProxyKind>::DESCRIPTOR.id,
            offset: $offset,
        }
    };

    // ------------------------------------------------------------------------
    // Field-update dispatch, one arm per composite field
    // ------------------------------------------------------------------------
    (@update $slots:ident $name:ident $handle:ident $field:ident value) => {};
    (@update $slots:ident $name:ident $handle:ident $field:ident boxed) => {
        if $name == stringify!($field) {
            $slots.record(stringify!($field), $handle);
            return $crate::FieldUpdate::Installed;
        }
    };
    (@update $slots:ident $name:ident $handle:ident $field:ident inline, $offset:literal) => {
        if $name == stringify!($field) {
            $slots.record(stringify!($field), $handle);
            return $crate::FieldUpdate::Relocated($handle.offset_back($offset));
        }
    };

    // ------------------------------------------------------------------------
    // Accessor trait
    // ------------------------------------------------------------------------
    (@signature $field:ident value $ty:ty, $getter:ident, $setter:ident) => {
        #[doc = concat!("Read `", stringify!($field), "`")]
        fn $getter(&self) -> $crate::AbiResult<$ty>;

        #[doc = concat!("Replace `", stringify!($field), "`")]
        fn $setter(&self, value: impl Into<$ty>) -> $crate::AbiResult<()>;
    };
    (@signature $field:ident $repr:ident $ty:ty, $getter:ident, $setter:ident) => {
        #[doc = concat!("Read `", stringify!($field), "` as a nested proxy")]
        fn $getter(&self) -> $crate::AbiResult<$crate::Nested<$ty>>;

        #[doc = concat!("Replace `", stringify!($field), "` with a copy of `value`")]
        fn $setter(&self, value: &$crate::Proxy<$ty>) -> $crate::AbiResult<()>;
    };

    (@accessor $field:ident value $ty:ty, $getter:ident, $setter:ident) => {
        fn $getter(&self) -> $crate::AbiResult<$ty> {
            self.get::<$ty>(stringify!($field))
        }

        fn $setter(&self, value: impl Into<$ty>) -> $crate::AbiResult<()> {
            let value: $ty = value.into();
            self.set(stringify!($field), &value)
        }
    };
    (@accessor $field:ident $repr:ident $ty:ty, $getter:ident, $setter:ident) => {
        fn $getter(&self) -> $crate::AbiResult<$crate::Nested<$ty>> {
            self.nested::<$ty>(stringify!($field))
        }

        fn $setter(&self, value: &$crate::Proxy<$ty>) -> $crate::AbiResult<()> {
            self.set_nested(stringify!($field), value)
        }
    };

    // ------------------------------------------------------------------------
    // Entry point
    // ------------------------------------------------------------------------
    (
        $(#[$meta:meta])*
        $vis:vis kind $name:ident($id:literal): $ext:ident {
            $(
                $field:ident : $repr:ident $ty:ty $(= $offset:literal)? { $getter:ident, $setter:ident }
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        $vis struct $name;

        impl $crate::ProxyKind for $name {
            const DESCRIPTOR: &'static $crate::KindDescriptor = &$crate::KindDescriptor {
                id: $id,
                fields: &[
                    $(
                        $crate::FieldDescriptor {
                            name: stringify!($field),
                            repr: $crate::proxy_kind!(@repr $repr $ty $(, $offset)?),
                        },
                    )*
                ],
            };

            #[allow(unused_variables)]
            fn update_field(
                slots: &mut $crate::FieldSlots,
                field: &str,
                handle: $crate::Handle,
            ) -> $crate::FieldUpdate {
                $(
                    $crate::proxy_kind!(@update slots field handle $field $repr $(, $offset)?);
                )*
                $crate::FieldUpdate::Unknown
            }
        }

        #[doc = concat!("Typed accessors for `", $id, "` proxies")]
        $vis trait $ext {
            $(
                $crate::proxy_kind!(@signature $field $repr $ty, $getter, $setter);
            )*
        }

        impl $ext for $crate::Proxy<$name> {
            $(
                $crate::proxy_kind!(@accessor $field $repr $ty, $getter, $setter);
            )*
        }
    };
}
