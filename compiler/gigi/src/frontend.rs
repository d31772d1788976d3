//! The front end as seen from the lowering utilities.
//!
//! Entities are opaque [`EntityId`]s; everything this layer needs to know
//! about them goes through [`FrontEnd`]. [`EntityStore`] is a plain-vector
//! implementation for drivers that already hold resolved entity tables, and
//! for tests.

use gigi_ir::{EntityId, SourceLoc};

/// Category of an entity, as far as scope walking cares.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Function,
    Procedure,
    RecordType,
    RecordSubtype,
    /// Any other type or subtype.
    Type,
    Package,
    /// Record component or discriminant.
    Component,
    /// Object, constant or parameter.
    Object,
    Other,
}

impl EntityKind {
    #[inline]
    pub fn is_subprogram(self) -> bool {
        matches!(self, EntityKind::Function | EntityKind::Procedure)
    }

    #[inline]
    pub fn is_record(self) -> bool {
        matches!(self, EntityKind::RecordType | EntityKind::RecordSubtype)
    }
}

/// Queries on already-analyzed entities.
pub trait FrontEnd {
    /// Number of entities; association tables are sized from it.
    fn entity_count(&self) -> usize;

    fn kind(&self, entity: EntityId) -> EntityKind;

    /// Enclosing scope, [`EntityId::EMPTY`] at library level.
    fn scope(&self, entity: EntityId) -> EntityId;

    fn name(&self, entity: EntityId) -> &str;

    fn sloc(&self, entity: EntityId) -> SourceLoc;

    fn comes_from_source(&self, entity: EntityId) -> bool;

    fn warnings_off(&self, entity: EntityId) -> bool;

    fn needs_debug_info(&self, entity: EntityId) -> bool;

    fn is_by_reference_type(&self, entity: EntityId) -> bool;

    fn has_discriminants(&self, entity: EntityId) -> bool;

    /// Unchecked union whose components all live in the variant part.
    fn is_unchecked_union(&self, entity: EntityId) -> bool;

    fn is_tagged_or_concurrent(&self, entity: EntityId) -> bool;

    /// Location of the component, size or object-size clause of `entity`.
    fn rep_clause_loc(&self, entity: EntityId) -> Option<SourceLoc>;

    /// Type of an object or component entity.
    fn etype(&self, entity: EntityId) -> EntityId {
        entity
    }

    /// Component type of an array entity.
    fn component_type(&self, entity: EntityId) -> EntityId {
        entity
    }

    /// Full view of a private or incomplete type.
    fn underlying_type(&self, entity: EntityId) -> EntityId {
        entity
    }

    fn is_record_type(&self, entity: EntityId) -> bool {
        self.kind(entity).is_record()
    }
}

/// Everything [`EntityStore`] knows about one entity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityInfo {
    pub name: String,
    pub kind: EntityKind,
    pub scope: EntityId,
    pub sloc: SourceLoc,
    pub comes_from_source: bool,
    pub warnings_off: bool,
    pub needs_debug_info: bool,
    pub by_reference: bool,
    pub has_discriminants: bool,
    pub unchecked_union: bool,
    pub tagged_or_concurrent: bool,
    pub rep_clause_loc: Option<SourceLoc>,
    pub etype: EntityId,
    pub underlying: EntityId,
}

impl EntityInfo {
    pub fn new(name: impl Into<String>, kind: EntityKind) -> Self {
        EntityInfo {
            name: name.into(),
            kind,
            scope: EntityId::EMPTY,
            sloc: SourceLoc::default(),
            comes_from_source: true,
            warnings_off: false,
            needs_debug_info: false,
            by_reference: false,
            has_discriminants: false,
            unchecked_union: false,
            tagged_or_concurrent: false,
            rep_clause_loc: None,
            etype: EntityId::EMPTY,
            underlying: EntityId::EMPTY,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: EntityId) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_sloc(mut self, sloc: SourceLoc) -> Self {
        self.sloc = sloc;
        self
    }

    #[must_use]
    pub fn with_rep_clause(mut self, loc: SourceLoc) -> Self {
        self.rep_clause_loc = Some(loc);
        self
    }

    #[must_use]
    pub fn generated(mut self) -> Self {
        self.comes_from_source = false;
        self
    }
}

/// Entity table backed by a vector; index 0 is the empty entity.
#[derive(Clone, Debug)]
pub struct EntityStore {
    entities: Vec<EntityInfo>,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        EntityStore {
            entities: vec![EntityInfo::new("", EntityKind::Other).generated()],
        }
    }

    pub fn add(&mut self, info: EntityInfo) -> EntityId {
        let raw = u32::try_from(self.entities.len())
            .unwrap_or_else(|_| panic!("entity store exceeded u32::MAX entities"));
        self.entities.push(info);
        EntityId::from_raw(raw)
    }

    pub fn info(&self, entity: EntityId) -> &EntityInfo {
        &self.entities[entity.index()]
    }

    pub fn info_mut(&mut self, entity: EntityId) -> &mut EntityInfo {
        &mut self.entities[entity.index()]
    }
}

impl FrontEnd for EntityStore {
    fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn kind(&self, entity: EntityId) -> EntityKind {
        self.info(entity).kind
    }

    fn scope(&self, entity: EntityId) -> EntityId {
        self.info(entity).scope
    }

    fn name(&self, entity: EntityId) -> &str {
        &self.info(entity).name
    }

    fn sloc(&self, entity: EntityId) -> SourceLoc {
        self.info(entity).sloc
    }

    fn comes_from_source(&self, entity: EntityId) -> bool {
        self.info(entity).comes_from_source
    }

    fn warnings_off(&self, entity: EntityId) -> bool {
        self.info(entity).warnings_off
    }

    fn needs_debug_info(&self, entity: EntityId) -> bool {
        self.info(entity).needs_debug_info
    }

    fn is_by_reference_type(&self, entity: EntityId) -> bool {
        self.info(entity).by_reference
    }

    fn has_discriminants(&self, entity: EntityId) -> bool {
        self.info(entity).has_discriminants
    }

    fn is_unchecked_union(&self, entity: EntityId) -> bool {
        self.info(entity).unchecked_union
    }

    fn is_tagged_or_concurrent(&self, entity: EntityId) -> bool {
        self.info(entity).tagged_or_concurrent
    }

    fn rep_clause_loc(&self, entity: EntityId) -> Option<SourceLoc> {
        self.info(entity).rep_clause_loc
    }

    fn etype(&self, entity: EntityId) -> EntityId {
        let etype = self.info(entity).etype;
        if etype.is_present() {
            etype
        } else {
            entity
        }
    }

    fn component_type(&self, entity: EntityId) -> EntityId {
        self.etype(entity)
    }

    fn underlying_type(&self, entity: EntityId) -> EntityId {
        let underlying = self.info(entity).underlying;
        if underlying.is_present() {
            underlying
        } else {
            entity
        }
    }
}
