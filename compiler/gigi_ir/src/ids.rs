//! Index newtypes into the [`TreeArena`](crate::TreeArena) and the
//! front-end's entity space.

use std::fmt;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn from_raw(raw: u32) -> Self {
                $name(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_type!(
    /// Handle to a type node.
    TypeId,
    "T"
);
index_type!(
    /// Handle to a declaration node.
    DeclId,
    "D"
);
index_type!(
    /// Handle to a lexical block.
    BlockId,
    "B"
);
index_type!(
    /// Front-end entity or node identifier. Only ever used as a lookup key.
    EntityId,
    "E"
);

impl EntityId {
    /// The front-end's "no entity" value.
    pub const EMPTY: EntityId = EntityId(0);

    #[inline]
    pub const fn is_present(self) -> bool {
        self.0 != 0
    }
}

/// Source position attached to declarations and diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub const fn new(line: u32, column: u32) -> Self {
        SourceLoc { line, column }
    }
}

/// Enclosing scope of a declaration or type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Context {
    /// The compilation unit as a whole.
    TranslationUnit,
    /// A subprogram body.
    Function(DeclId),
    /// A record type acting as a debug scope.
    Type(TypeId),
    /// Any other declaration a scope entity was elaborated into.
    Decl(DeclId),
}

impl Context {
    pub fn function(self) -> Option<DeclId> {
        match self {
            Context::Function(decl) => Some(decl),
            _ => None,
        }
    }
}
