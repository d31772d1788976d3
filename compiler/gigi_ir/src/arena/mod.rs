//! Owning storage for every tree node of a compilation.
//!
//! Nodes are never freed individually: the arena lives as long as the
//! compilation context, and handles ([`TypeId`], [`DeclId`], [`BlockId`])
//! stay valid for its whole lifetime.

use crate::{Block, BlockId, Decl, DeclId, Name, NameInterner, TypeId, TypeNode};

#[derive(Clone, Debug, Default)]
pub struct TreeArena {
    names: NameInterner,
    types: Vec<TypeNode>,
    decls: Vec<Decl>,
    blocks: Vec<Block>,
}

impl TreeArena {
    pub fn new() -> Self {
        TreeArena {
            names: NameInterner::new(),
            types: Vec::with_capacity(256),
            decls: Vec::with_capacity(256),
            blocks: Vec::new(),
        }
    }

    // ── Names ───────────────────────────────────────────────────

    pub fn intern(&mut self, s: &str) -> Name {
        self.names.intern(s)
    }

    pub fn names(&self) -> &NameInterner {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut NameInterner {
        &mut self.names
    }

    pub fn name_str(&self, name: Name) -> &str {
        self.names.lookup(name)
    }

    // ── Types ───────────────────────────────────────────────────

    /// Store a new type as its own main variant.
    pub fn alloc_type(&mut self, mut node: TypeNode) -> TypeId {
        let id = TypeId::from_raw(to_u32(self.types.len()));
        node.main_variant = id;
        node.variants.clear();
        self.types.push(node);
        id
    }

    #[inline]
    pub fn ty(&self, id: TypeId) -> &TypeNode {
        &self.types[id.index()]
    }

    #[inline]
    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        &mut self.types[id.index()]
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Distinct copy of `id` that is its own main variant, with no pointer
    /// types attached.
    pub fn copy_type(&mut self, id: TypeId) -> TypeId {
        let mut node = self.ty(id).clone();
        node.pointer_to = None;
        node.null_bounds = None;
        self.alloc_type(node)
    }

    /// Copy of `id` registered as a variant of its main variant.
    pub fn build_variant(&mut self, id: TypeId) -> TypeId {
        let main = self.ty(id).main_variant;
        let mut node = self.ty(id).clone();
        node.pointer_to = None;
        node.variants.clear();
        let new_id = TypeId::from_raw(to_u32(self.types.len()));
        node.main_variant = main;
        self.types.push(node);
        self.ty_mut(main).variants.push(new_id);
        new_id
    }

    /// The main variant followed by all its variants.
    pub fn variants_of(&self, id: TypeId) -> Vec<TypeId> {
        let main = self.ty(id).main_variant;
        let mut all = Vec::with_capacity(1 + self.ty(main).variants.len());
        all.push(main);
        all.extend_from_slice(&self.ty(main).variants);
        all
    }

    #[inline]
    pub fn main_variant(&self, id: TypeId) -> TypeId {
        self.ty(id).main_variant
    }

    /// Name of a type, looking through its naming declaration.
    pub fn type_name(&self, id: TypeId) -> Option<Name> {
        let node = self.ty(id);
        node.name_decl
            .and_then(|d| self.decl(d).name)
            .or(node.name)
    }

    // ── Declarations ────────────────────────────────────────────

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::from_raw(to_u32(self.decls.len()));
        self.decls.push(decl);
        id
    }

    #[inline]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    #[inline]
    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// First field of a record-shaped type.
    pub fn first_field(&self, record: TypeId) -> Option<DeclId> {
        self.ty(record).fields().first().copied()
    }

    /// Type of the `index`-th field.
    pub fn field_type(&self, record: TypeId, index: usize) -> Option<TypeId> {
        self.ty(record)
            .fields()
            .get(index)
            .map(|&f| self.decl(f).ty)
    }

    // ── Blocks ──────────────────────────────────────────────────

    pub fn alloc_block(&mut self, block: Block) -> BlockId {
        let id = BlockId::from_raw(to_u32(self.blocks.len()));
        self.blocks.push(block);
        id
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    #[inline]
    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }
}

/// Arena indices are `u32`; a compilation never holds four billion nodes.
#[inline]
fn to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("tree arena exceeded u32::MAX nodes"))
}
