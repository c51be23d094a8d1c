//! Interned string identifiers.
//!
//! Name hints on instructions, functions, struct fields and generic
//! envelopes are interned once per module and compared by index.

use std::fmt;

use rustc_hash::FxHashMap;

/// Interned string identifier.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    /// Get raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Single-threaded string interner owned by a module.
pub struct Interner {
    map: FxHashMap<Box<str>, Name>,
    strings: Vec<Box<str>>,
}

impl Interner {
    /// Create an interner with the empty string pre-interned.
    pub fn new() -> Self {
        let mut interner = Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, Name::EMPTY);
        interner
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(&name) = self.map.get(s) {
            return name;
        }
        let raw = u32::try_from(self.strings.len())
            .unwrap_or_else(|_| panic!("interner exceeds u32::MAX strings"));
        let name = Name(raw);
        self.strings.push(s.into());
        self.map.insert(s.into(), name);
        name
    }

    /// Look up the string for a `Name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` was not produced by this interner.
    pub fn lookup(&self, name: Name) -> &str {
        &self.strings[name.0 as usize]
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Always `false`: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
