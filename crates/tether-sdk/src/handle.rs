//! Handle: opaque address of a native-side value
//!
//! A handle is only an address. It carries no type information and no
//! ownership; a proxy pairs it with a kind descriptor and decides when it may
//! be passed across the boundary.

/// Opaque native address.
///
/// Two sentinels exist:
/// - [`Handle::NULL`] means "no object" and is never sent to a native call
/// - [`Handle::POISON`] marks a proxy whose storage was released
///
/// Every other value is valid only until the next mutation of the logical
/// value it denotes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The "no object" handle
    pub const NULL: Handle = Handle(0);

    /// Installed into a proxy after release
    pub const POISON: Handle = Handle(u64::MAX);

    /// Create from a raw address
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw address
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Check for the null sentinel
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == Self::NULL.0
    }

    /// Check for the poison sentinel
    #[inline]
    pub const fn is_poisoned(self) -> bool {
        self.0 == Self::POISON.0
    }

    /// True for any handle that may be sent to the native side
    #[inline]
    pub const fn is_live(self) -> bool {
        !self.is_null() && !self.is_poisoned()
    }

    /// Address of a value embedded `offset` bytes into this one
    #[inline]
    pub const fn offset_by(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    /// Address of the value that embeds this one at `offset`
    #[inline]
    pub const fn offset_back(self, offset: u64) -> Self {
        Self(self.0.wrapping_sub(offset))
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Handle::NULL")
        } else if self.is_poisoned() {
            write!(f, "Handle::POISON")
        } else {
            write!(f, "Handle({:#x})", self.0)
        }
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
