//! Interned identifiers.
//!
//! Type, field and declaration names are compared by identity all over the
//! layout engine (`TYPE_NAME (a) == TYPE_NAME (b)` style checks), so every
//! name is interned once into a [`NameInterner`] and passed around as a
//! 4-byte [`Name`].

use std::fmt;

use rustc_hash::FxHashMap;

/// Interned identifier.
///
/// Equality is identity: two `Name`s are equal exactly when they were
/// interned from the same string in the same interner.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// Error when interning a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternError {
    /// More than `u32::MAX` distinct names.
    Overflow { count: usize },
}

impl fmt::Display for InternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternError::Overflow { count } => {
                write!(f, "name interner exceeded capacity: {count} names")
            }
        }
    }
}

impl std::error::Error for InternError {}

/// Single-threaded string interner.
///
/// The lowering utilities run inside one compilation on one thread, so a
/// plain map plus a vector is enough.
#[derive(Clone, Debug)]
pub struct NameInterner {
    map: FxHashMap<Box<str>, Name>,
    strings: Vec<Box<str>>,
}

impl Default for NameInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl NameInterner {
    pub fn new() -> Self {
        let mut interner = NameInterner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        interner.strings.push(Box::from(""));
        interner.map.insert(Box::from(""), Name::EMPTY);
        interner
    }

    /// Intern `s`, returning an error on overflow.
    pub fn try_intern(&mut self, s: &str) -> Result<Name, InternError> {
        if let Some(&name) = self.map.get(s) {
            return Ok(name);
        }
        let idx = u32::try_from(self.strings.len()).map_err(|_| InternError::Overflow {
            count: self.strings.len(),
        })?;
        let name = Name(idx);
        self.strings.push(Box::from(s));
        self.map.insert(Box::from(s), name);
        Ok(name)
    }

    /// Intern `s`.
    ///
    /// # Panics
    /// Panics if the interner overflows.
    pub fn intern(&mut self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up an already interned string without inserting it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.map.get(s).copied()
    }

    /// Resolve a name back to its text.
    pub fn lookup(&self, name: Name) -> &str {
        self.strings.get(name.0 as usize).map_or("", |s| s)
    }

    /// Build `<base>___<suffix>`, the encoding used for compiler-generated
    /// companion types (`XUP`, `XUB`, `PAD`, ...).
    pub fn concat(&mut self, base: Name, suffix: &str) -> Name {
        let text = format!("{}___{suffix}", self.lookup(base));
        self.intern(&text)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

#[cfg(test)]
mod tests;
