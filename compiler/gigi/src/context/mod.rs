//! The compilation context.
//!
//! Every table the lowering utilities mutate lives in [`GigiContext`]: the
//! tree arena, the entity association tables, the canonicalization caches,
//! the deferred-context queue and the binding-level stack. One context is
//! created per compilation unit and threaded by `&mut` through every
//! construction call; [`GigiContext::finish`] tears it down.

use gigi_diagnostic::{Diagnostic, DiagnosticQueue};
use gigi_ir::{
    Context, Decl, DeclFlags, DeclId, DeclKind, IntFlavor, IntInfo, Mode, Sym, TreeArena,
    TypeFlags, TypeId, TypeKind, TypeNode,
};
use rustc_hash::FxHashMap;

use crate::binding::BindingLevels;
use crate::canon::CanonCaches;
use crate::deferred::DeferredQueue;
use crate::entity_table::EntityTable;
use crate::{FrontEnd, UtilsConfig, UtilsError};

/// Types every compilation needs, built once by [`GigiContext::new`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CommonTypes {
    pub void: TypeId,
    /// Unsigned pointer-sized type for sizes in storage units.
    pub sizetype: TypeId,
    /// Signed type wide enough for sizes in bits.
    pub bitsizetype: TypeId,
    pub boolean: TypeId,
    /// The host `char`.
    pub char: TypeId,
    pub signed_char: TypeId,
    pub unsigned_char: TypeId,
}

/// What is left of a context once the unit is finished.
#[derive(Debug)]
pub struct Finished {
    pub arena: TreeArena,
    /// Global declarations in source order.
    pub global_decls: Vec<DeclId>,
    /// Global declarations in the order they are handed to the back end.
    pub output_order: Vec<DeclId>,
    pub builtin_decls: Vec<DeclId>,
    /// Warnings sorted by source position.
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-unit state of the lowering utilities.
pub struct GigiContext<'fe> {
    pub(crate) frontend: &'fe dyn FrontEnd,
    pub(crate) config: UtilsConfig,
    pub(crate) arena: TreeArena,
    pub(crate) entities: EntityTable,
    pub(crate) caches: CanonCaches,
    pub(crate) deferred: DeferredQueue,
    pub(crate) levels: BindingLevels,
    pub(crate) diagnostics: DiagnosticQueue,
    /// `gnat_type_for_size` results, keyed by precision and signedness.
    pub(crate) int_types: FxHashMap<(u32, bool), TypeId>,
    /// `float_type_for_precision` results, keyed by mode size.
    pub(crate) float_types: FxHashMap<u32, TypeId>,
    pub(crate) common: CommonTypes,
}

impl<'fe> GigiContext<'fe> {
    /// Set up the tables for one unit of `frontend`.
    pub fn new(frontend: &'fe dyn FrontEnd, config: UtilsConfig) -> Self {
        let mut arena = TreeArena::new();
        let common = build_common_types(&mut arena, &config);
        let diagnostics = DiagnosticQueue::with_config(config.diagnostics.clone());
        tracing::debug!(entities = frontend.entity_count(), "initializing lowering context");
        GigiContext {
            frontend,
            entities: EntityTable::with_capacity(frontend.entity_count()),
            caches: CanonCaches::default(),
            deferred: DeferredQueue::default(),
            levels: BindingLevels::default(),
            diagnostics,
            int_types: FxHashMap::default(),
            float_types: FxHashMap::default(),
            common,
            config,
            arena,
        }
    }

    /// Resolve every pending context and hand back the unit's output.
    pub fn finish(mut self) -> Result<Finished, UtilsError> {
        self.flush_deferred(true)?;
        let open = self.levels.depth();
        if open > 0 {
            return Err(UtilsError::UnclosedBindingLevel { open });
        }
        tracing::debug!(
            types = self.arena.type_count(),
            decls = self.arena.decl_count(),
            "lowering context finished"
        );
        let output_order = self.gnat_write_global_declarations();
        Ok(Finished {
            output_order,
            global_decls: std::mem::take(&mut self.levels.global_decls),
            builtin_decls: std::mem::take(&mut self.levels.builtin_decls),
            diagnostics: self.diagnostics.flush(),
            arena: self.arena,
        })
    }

    /// Order in which the global declarations are emitted.
    ///
    /// Integral variables come first so that global types can use them as
    /// bounds, then type declarations, the remaining variables, named
    /// constants and finally imported subprograms. External variables are
    /// only emitted when they carry debug info; ignored type declarations,
    /// constants and subprograms are not emitted at all.
    pub fn gnat_write_global_declarations(&self) -> Vec<DeclId> {
        let globals = &self.levels.global_decls;
        let emitted_var = |d: &Decl| {
            d.is_var() && (!d.has(DeclFlags::EXTERNAL) || !d.has(DeclFlags::IGNORED))
        };
        let integral = |d: &Decl| self.ty(d.ty).is_integral();
        let passes: [&dyn Fn(&Decl) -> bool; 5] = [
            &|d: &Decl| emitted_var(d) && integral(d),
            &|d: &Decl| d.is_type_decl() && !d.has(DeclFlags::IGNORED),
            &|d: &Decl| emitted_var(d) && !integral(d),
            &|d: &Decl| matches!(d.kind, DeclKind::Const { .. }) && !d.has(DeclFlags::IGNORED),
            &|d: &Decl| {
                d.as_function().is_some_and(|f| f.body.is_none())
                    && d.has(DeclFlags::EXTERNAL)
                    && !d.has(DeclFlags::IGNORED)
            },
        ];
        let order: Vec<DeclId> = passes
            .iter()
            .flat_map(|pass| globals.iter().copied().filter(move |&id| pass(self.decl(id))))
            .collect();
        tracing::debug!(globals = globals.len(), emitted = order.len(), "global declarations ordered");
        order
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn arena(&self) -> &TreeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut TreeArena {
        &mut self.arena
    }

    pub fn config(&self) -> &UtilsConfig {
        &self.config
    }

    pub fn common(&self) -> CommonTypes {
        self.common
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    pub fn frontend(&self) -> &'fe dyn FrontEnd {
        self.frontend
    }

    /// The translation unit every global declaration belongs to.
    pub fn get_global_context(&self) -> Context {
        Context::TranslationUnit
    }

    // ── Shorthands ──────────────────────────────────────────────

    #[inline]
    pub(crate) fn ty(&self, id: TypeId) -> &TypeNode {
        self.arena.ty(id)
    }

    #[inline]
    pub(crate) fn ty_mut(&mut self, id: TypeId) -> &mut TypeNode {
        self.arena.ty_mut(id)
    }

    #[inline]
    pub(crate) fn decl(&self, id: DeclId) -> &Decl {
        self.arena.decl(id)
    }

    #[inline]
    pub(crate) fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        self.arena.decl_mut(id)
    }

    #[inline]
    pub(crate) fn bits_per_unit(&self) -> u32 {
        self.config.target.bits_per_unit
    }
}

fn int_node(precision: u32, size: u32, unsigned: bool, flavor: IntFlavor) -> TypeNode {
    let mut info = IntInfo::new(precision, unsigned);
    info.flavor = flavor;
    let mut node = TypeNode::new(TypeKind::Integer(info));
    node.size = Some(Sym::from(size));
    node.size_unit = Some(Sym::from(size / 8));
    node.align = size;
    node.mode = Mode::Int(size);
    node
}

fn build_common_types(arena: &mut TreeArena, config: &UtilsConfig) -> CommonTypes {
    let ptr = config.target.pointer_size;

    let mut void = TypeNode::new(TypeKind::Void);
    void.name = Some(arena.intern("void"));
    let void = arena.alloc_type(void);

    let mut sizetype = int_node(ptr, ptr, true, IntFlavor::Plain);
    sizetype.name = Some(arena.intern("sizetype"));
    sizetype.flags |= TypeFlags::ARTIFICIAL;
    let sizetype = arena.alloc_type(sizetype);

    let mut bitsizetype = int_node(ptr, ptr, false, IntFlavor::Plain);
    bitsizetype.name = Some(arena.intern("bitsizetype"));
    bitsizetype.flags |= TypeFlags::ARTIFICIAL;
    let bitsizetype = arena.alloc_type(bitsizetype);

    let mut boolean = int_node(1, 8, true, IntFlavor::Boolean);
    boolean.name = Some(arena.intern("boolean"));
    let boolean = arena.alloc_type(boolean);

    let mut char_node = int_node(8, 8, !config.target.char_is_signed, IntFlavor::Character);
    char_node.name = Some(arena.intern("char"));
    char_node.flags |= TypeFlags::STRING;
    let char_type = arena.alloc_type(char_node);

    let mut signed_char = int_node(8, 8, false, IntFlavor::Character);
    signed_char.name = Some(arena.intern("signed char"));
    signed_char.flags |= TypeFlags::STRING;
    let signed_char = arena.alloc_type(signed_char);

    let mut unsigned_char = int_node(8, 8, true, IntFlavor::Character);
    unsigned_char.name = Some(arena.intern("unsigned char"));
    unsigned_char.flags |= TypeFlags::STRING;
    let unsigned_char = arena.alloc_type(unsigned_char);

    CommonTypes {
        void,
        sizetype,
        bitsizetype,
        boolean,
        char: char_type,
        signed_char,
        unsigned_char,
    }
}
