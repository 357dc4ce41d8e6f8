use std::fmt;

/// Identifier of a live entry in an [`IdRegistry`](crate::IdRegistry).
///
/// Handles are unique among currently-live objects; the allocator never hands
/// out a value that is still occupied. `Handle::NULL` (0) is reserved as a
/// sentinel and is never allocated, so a zeroed guest word can always be
/// treated as "no object".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    pub const NULL: Handle = Handle(0);

    pub const fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<Handle> for u32 {
    fn from(h: Handle) -> u32 {
        h.0
    }
}
