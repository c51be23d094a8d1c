//! Id newtypes for everything the [`Module`](crate::Module) owns.
//!
//! Every entity in a module is addressed by a 32-bit index into one of
//! the module's arenas. Ids are never reused: removing an instruction or
//! block marks its slot dead, so an id stays meaningful (and comparable)
//! for the whole lifetime of the module.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into arenas).
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Id for the next slot of an arena that currently holds `len` entries.
            pub(crate) fn from_len(len: usize) -> Self {
                Self(u32::try_from(len).unwrap_or_else(|_| {
                    panic!(concat!(stringify!($name), " count exceeds u32::MAX"))
                }))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// An instruction (value or effect) inside a module.
    InstId,
    "%"
);

define_id!(
    /// A basic block inside a module.
    BlockId,
    "bb"
);

define_id!(
    /// A function inside a module.
    FuncId,
    "@f"
);

define_id!(
    /// A struct definition in the type pool.
    StructId,
    "struct"
);

define_id!(
    /// A generic envelope (type-parameter list) in the type pool.
    GenericId,
    "generic"
);

define_id!(
    /// Key addressing one field of a struct.
    ///
    /// Keys are allocated module-wide, so a key identifies both the
    /// struct it belongs to and the field within it. A key is never
    /// reassigned once handed out.
    FieldKey,
    "key"
);

#[cfg(test)]
mod tests {
    use std::mem;

    use super::*;

    #[test]
    fn id_basics() {
        let i = InstId::new(42);
        assert_eq!(i.raw(), 42);
        assert_eq!(i.index(), 42);
        assert_eq!(BlockId::from_len(3), BlockId::new(3));
    }

    #[test]
    fn id_display_prefixes() {
        assert_eq!(InstId::new(7).to_string(), "%7");
        assert_eq!(BlockId::new(2).to_string(), "bb2");
        assert_eq!(format!("{:?}", FieldKey::new(1)), "key1");
    }

    #[test]
    fn id_sizes() {
        assert_eq!(mem::size_of::<InstId>(), 4);
        assert_eq!(mem::size_of::<FieldKey>(), 4);
    }
}
