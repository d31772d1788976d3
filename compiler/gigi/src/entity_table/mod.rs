//! Entity to tree association, and dummy types for forward references.
//!
//! Each front-end entity maps to at most one tree node, written once per
//! generation: a second association must be preceded by an explicit reset
//! (`save_gnu_tree(entity, None, _)`). A parallel table holds the dummy type
//! made for an entity whose full type is not elaborated yet.

use gigi_ir::{
    DeclFlags, DeclId, EntityId, IntFlavor, IntInfo, RecordKind, TypeFlags, TypeId, TypeKind,
    TypeNode,
};

use crate::{GigiContext, UtilsError};

/// Tree node associated with an entity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GnuNode {
    Decl(DeclId),
    /// Non-declaration node, only storable with `no_check`.
    Type(TypeId),
}

impl GnuNode {
    pub fn decl(self) -> Option<DeclId> {
        match self {
            GnuNode::Decl(d) => Some(d),
            GnuNode::Type(_) => None,
        }
    }
}

/// Association and dummy tables, indexed by entity.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityTable {
    nodes: Vec<Option<GnuNode>>,
    dummies: Vec<Option<TypeId>>,
}

impl EntityTable {
    pub(crate) fn with_capacity(entities: usize) -> Self {
        EntityTable {
            nodes: vec![None; entities],
            dummies: vec![None; entities],
        }
    }

    pub(crate) fn get(&self, entity: EntityId) -> Option<GnuNode> {
        self.nodes.get(entity.index()).copied().flatten()
    }

    fn set(&mut self, entity: EntityId, node: Option<GnuNode>) {
        let i = entity.index();
        if i >= self.nodes.len() {
            self.nodes.resize(i + 1, None);
        }
        self.nodes[i] = node;
    }

    fn dummy(&self, entity: EntityId) -> Option<TypeId> {
        self.dummies.get(entity.index()).copied().flatten()
    }

    fn set_dummy(&mut self, entity: EntityId, ty: TypeId) {
        let i = entity.index();
        if i >= self.dummies.len() {
            self.dummies.resize(i + 1, None);
        }
        self.dummies[i] = Some(ty);
    }
}

impl GigiContext<'_> {
    // ── Association ─────────────────────────────────────────────

    /// Associate `node` with `entity`, or reset the association with `None`.
    ///
    /// Unless `no_check`, only declarations may be associated.
    pub fn try_save_gnu_tree(
        &mut self,
        entity: EntityId,
        node: Option<GnuNode>,
        no_check: bool,
    ) -> Result<(), UtilsError> {
        if let Some(node) = node {
            if self.entities.get(entity).is_some() {
                return Err(UtilsError::AlreadyAssociated { entity });
            }
            if !no_check && node.decl().is_none() {
                return Err(UtilsError::NotADecl { entity });
            }
        }
        self.entities.set(entity, node);
        Ok(())
    }

    /// Like [`try_save_gnu_tree`](Self::try_save_gnu_tree), treating a
    /// violation as an internal error.
    pub fn save_gnu_tree(&mut self, entity: EntityId, node: Option<GnuNode>, no_check: bool) {
        self.try_save_gnu_tree(entity, node, no_check)
            .unwrap_or_else(|e| e.ice());
    }

    pub fn try_get_gnu_tree(&self, entity: EntityId) -> Result<GnuNode, UtilsError> {
        self.entities
            .get(entity)
            .ok_or(UtilsError::NotAssociated { entity })
    }

    pub fn get_gnu_tree(&self, entity: EntityId) -> GnuNode {
        self.try_get_gnu_tree(entity).unwrap_or_else(|e| e.ice())
    }

    pub fn present_gnu_tree(&self, entity: EntityId) -> bool {
        self.entities.get(entity).is_some()
    }

    // ── Dummy types ─────────────────────────────────────────────

    pub fn get_dummy_type(&self, entity: EntityId) -> Option<TypeId> {
        self.entities.dummy(entity)
    }

    pub fn present_dummy_type(&self, entity: EntityId) -> bool {
        self.entities.dummy(entity).is_some()
    }

    /// Placeholder type for `gnat_type`, created once per underlying type.
    pub fn make_dummy_type(&mut self, gnat_type: EntityId) -> TypeId {
        let fe = self.frontend;
        let underlying = fe.underlying_type(gnat_type);
        let equiv = if underlying.is_present() {
            underlying
        } else {
            gnat_type
        };

        if let Some(existing) = self.entities.dummy(equiv) {
            return existing;
        }

        let kind = if fe.is_record_type(equiv) {
            if fe.is_unchecked_union(equiv) {
                TypeKind::Record(gigi_ir::RecordInfo::new(RecordKind::Union))
            } else {
                TypeKind::Record(gigi_ir::RecordInfo::new(RecordKind::Struct))
            }
        } else {
            TypeKind::Integer(dummy_enumeral())
        };

        let name = self.arena.intern(fe.name(gnat_type));
        let mut node = TypeNode::new(kind);
        node.name = Some(name);
        node.flags |= TypeFlags::DUMMY;
        if fe.is_by_reference_type(equiv) {
            node.flags |= TypeFlags::BY_REFERENCE;
        }
        if fe.has_discriminants(equiv) {
            node.flags |= TypeFlags::MAY_ALIAS;
        }
        let dummy = self.arena.alloc_type(node);
        let stub = self.create_type_stub_decl(Some(name), dummy);
        self.ty_mut(dummy).stub_decl = Some(stub);

        self.entities.set_dummy(equiv, dummy);

        // Debuggers only get an opaque stand-in for the incomplete type.
        if fe.needs_debug_info(gnat_type) {
            let mut debug = TypeNode::new(TypeKind::LangType);
            debug.name = Some(name);
            debug.flags |= self.ty(dummy).flags & TypeFlags::ARTIFICIAL;
            let debug = self.arena.alloc_type(debug);
            self.ty_mut(dummy).debug_type = Some(debug);
        }

        tracing::debug!(entity = ?gnat_type, ty = ?dummy, "made dummy type");
        dummy
    }

    /// Dummy fat pointer and object record for an access to the
    /// unconstrained array `desig_type`, whose entity is `gnat_desig_type`.
    pub fn build_dummy_unc_pointer_types(&mut self, gnat_desig_type: EntityId, desig_type: TypeId) {
        let base = self.arena.intern(self.frontend.name(gnat_desig_type));

        let template = self.dummy_record(base, "XUB", RecordKind::Struct);
        let ptr_template = self.build_pointer_type(template);

        let array_name = self.arena.names_mut().concat(base, "XUA");
        let mut array = TypeNode::new(TypeKind::Integer(dummy_enumeral()));
        array.name = Some(array_name);
        array.flags |= TypeFlags::DUMMY;
        let array = self.arena.alloc_type(array);
        let ptr_array = self.build_pointer_type(array);

        let fat = self.arena.alloc_type(TypeNode::record(RecordKind::Struct));
        let fat_name = self.arena.names_mut().concat(base, "XUP");
        let fat_decl = self.create_type_stub_decl(Some(fat_name), fat);
        self.ty_mut(fat).name_decl = Some(fat_decl);

        let p_array = self.arena.intern("P_ARRAY");
        let p_bounds = self.arena.intern("P_BOUNDS");
        let f_array = self.create_field_decl(Some(p_array), ptr_array, fat, None, None, 0, 1);
        let f_bounds = self.create_field_decl(Some(p_bounds), ptr_template, fat, None, None, 0, 1);
        self.finish_fat_pointer_type(fat, vec![f_array, f_bounds]);
        if let Some(record) = self.ty_mut(fat).as_record_mut() {
            record.unconstrained_array = Some(desig_type);
        }
        // Only the completed fat pointer is described to the debugger.
        if let Some(stub) = self.ty(fat).stub_decl {
            self.decl_mut(stub).flags |= DeclFlags::IGNORED;
        }

        let object = self.dummy_record(base, "XUT", RecordKind::Struct);

        let desig = self.ty_mut(desig_type);
        desig.pointer_to = Some(fat);
        desig.object_record = Some(object);
    }

    fn dummy_record(&mut self, base: gigi_ir::Name, suffix: &str, kind: RecordKind) -> TypeId {
        let name = self.arena.names_mut().concat(base, suffix);
        let mut node = TypeNode::record(kind);
        node.name = Some(name);
        node.flags |= TypeFlags::DUMMY;
        self.arena.alloc_type(node)
    }
}

fn dummy_enumeral() -> IntInfo {
    let mut info = IntInfo::new(0, true);
    info.flavor = IntFlavor::Enumeral;
    info
}
