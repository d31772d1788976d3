//! Canonicalization caches for synthesized types.
//!
//! Padded, packable and sized types are rebuilt on demand by the layout
//! engine. Two requests describing the same type must get the same node, so
//! each kind of type has a memoization map keyed by the fields that define
//! its identity: insert the candidate if absent, else hand back the node
//! already stored. Only types of constant size are ever entered.

use std::hash::Hash;

use gigi_ir::{Name, Sym, TreeArena, TypeId};
use rustc_hash::FxHashMap;

/// Identity of a packable record.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct PackableKey {
    pub name: Option<Name>,
    pub size: Option<Sym>,
    pub align: u32,
    pub ada_size: Option<Sym>,
    pub reverse: bool,
}

impl PackableKey {
    pub(crate) fn of(arena: &TreeArena, ty: TypeId) -> Self {
        let node = arena.ty(ty);
        PackableKey {
            name: arena.type_name(ty),
            size: node.size.clone(),
            align: node.align,
            ada_size: node.rm_size.clone(),
            reverse: node.is_reverse_storage_order(),
        }
    }
}

/// Identity of a padding record: the padded type plus the padding.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct PadKey {
    pub inner: TypeId,
    pub size: Option<Sym>,
    pub align: u32,
    pub ada_size: Option<Sym>,
    pub reverse: bool,
}

impl PadKey {
    pub(crate) fn of(arena: &TreeArena, ty: TypeId) -> Option<Self> {
        let node = arena.ty(ty);
        let inner = arena.field_type(ty, 0)?;
        Some(PadKey {
            inner,
            size: node.size.clone(),
            align: node.align,
            ada_size: node.rm_size.clone(),
            reverse: node.is_reverse_storage_order(),
        })
    }
}

/// Identity of an integer type made for a given size.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct SizedKey {
    pub name: Option<Name>,
    pub size: Option<Sym>,
    pub align: u32,
    pub rm_size: Option<Sym>,
    pub biased: bool,
}

impl SizedKey {
    pub(crate) fn of(arena: &TreeArena, ty: TypeId) -> Self {
        let node = arena.ty(ty);
        SizedKey {
            name: arena.type_name(ty),
            size: node.size.clone(),
            align: node.align,
            rm_size: node.rm_size.clone(),
            biased: node.is_biased(),
        }
    }
}

/// Insert-if-absent map from a structural key to its representative.
#[derive(Clone, Debug)]
pub(crate) struct CanonCache<K> {
    map: FxHashMap<K, TypeId>,
}

impl<K> Default for CanonCache<K> {
    fn default() -> Self {
        CanonCache {
            map: FxHashMap::default(),
        }
    }
}

impl<K: Hash + Eq> CanonCache<K> {
    /// Representative for `key`, registering `candidate` on a miss.
    pub(crate) fn canonicalize(&mut self, key: K, candidate: TypeId) -> TypeId {
        *self.map.entry(key).or_insert(candidate)
    }

    pub(crate) fn lookup(&self, key: &K) -> Option<TypeId> {
        self.map.get(key).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct CanonCaches {
    pub packable: CanonCache<PackableKey>,
    pub pad: CanonCache<PadKey>,
    pub sized: CanonCache<SizedKey>,
}
