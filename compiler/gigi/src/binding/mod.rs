//! Binding levels and declaration placement.
//!
//! The binding-level stack mirrors the lexical nesting of the unit being
//! lowered. Each level owns a [`Block`] that collects the declarations made
//! in it; popping a level either threads its block into the parent or, when
//! it declared nothing, hands its sub-blocks to the parent so no vacuous
//! block reaches the debug info. [`GigiContext::gnat_pushdecl`] decides
//! where a new declaration lives: in the current function, at global level,
//! or in a record scope that may have to wait on the deferred queue.

use gigi_ir::{Block, BlockId, Context, DeclFlags, DeclId, DeclKind, EntityId, TypeFlags, TypeId};

use crate::{DeferredToken, GigiContext, UtilsError};

#[derive(Clone, Debug, Default)]
pub(crate) struct BindingLevels {
    /// Open levels, innermost last.
    stack: Vec<BlockId>,
    /// Blocks of discarded or merged levels, reused by `gnat_pushlevel`.
    free_blocks: Vec<BlockId>,
    pub current_function: Option<DeclId>,
    /// Nonzero while declarations must go to the global level.
    pub force_global: u32,
    pub global_decls: Vec<DeclId>,
    pub builtin_decls: Vec<DeclId>,
}

impl BindingLevels {
    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }

    fn current(&self) -> Option<BlockId> {
        self.stack.last().copied()
    }
}

impl GigiContext<'_> {
    // ── Levels ──────────────────────────────────────────────────

    /// Whether declarations made now are global.
    pub fn global_bindings_p(&self) -> bool {
        self.levels.force_global > 0 || self.levels.current_function.is_none()
    }

    pub fn current_function(&self) -> Option<DeclId> {
        self.levels.current_function
    }

    /// Make declarations go to the global level until the matching
    /// [`pop_force_global`](Self::pop_force_global).
    pub fn push_force_global(&mut self) {
        self.levels.force_global += 1;
    }

    pub fn pop_force_global(&mut self) {
        self.levels.force_global = self.levels.force_global.saturating_sub(1);
    }

    /// Block of the innermost open level.
    pub fn current_block(&self) -> Option<BlockId> {
        self.levels.current()
    }

    /// Open a new binding level.
    pub fn gnat_pushlevel(&mut self) -> BlockId {
        let block = match self.levels.free_blocks.pop() {
            Some(reused) => {
                *self.arena.block_mut(reused) = Block::default();
                reused
            }
            None => self.arena.alloc_block(Block::default()),
        };
        self.levels.stack.push(block);
        block
    }

    /// Mark the current block as the outermost block of `fndecl`.
    pub fn set_current_block_context(&mut self, fndecl: DeclId) {
        if let Some(block) = self.levels.current() {
            self.arena.block_mut(block).function = Some(fndecl);
        }
    }

    /// Close the current level, keeping its block if it is worth keeping.
    ///
    /// Returns the block when it survives, either as a function's outermost
    /// block or as a sub-block of the parent.
    pub fn gnat_poplevel(&mut self) -> Option<BlockId> {
        let block = self.levels.stack.pop()?;
        let parent = self.levels.current();

        if self.arena.block(block).function.is_some() {
            return Some(block);
        }

        if self.arena.block(block).vars.is_empty() {
            let subblocks = std::mem::take(&mut self.arena.block_mut(block).subblocks);
            if let Some(parent) = parent {
                self.arena.block_mut(parent).subblocks.extend(subblocks);
            }
            self.levels.free_blocks.push(block);
            return None;
        }

        if let Some(parent) = parent {
            self.arena.block_mut(parent).subblocks.push(block);
        }
        Some(block)
    }

    /// Close the current level and drop its block.
    pub fn gnat_zaplevel(&mut self) {
        if let Some(block) = self.levels.stack.pop() {
            self.levels.free_blocks.push(block);
        }
    }

    // ── Scopes ──────────────────────────────────────────────────

    /// Nearest enclosing scope of `node` that is a subprogram or a record
    /// type, and whether it is a subprogram.
    pub fn get_debug_scope(&self, node: EntityId) -> (EntityId, bool) {
        if !node.is_present() {
            return (EntityId::EMPTY, false);
        }
        let fe = self.frontend;
        let mut scope = fe.scope(node);
        while scope.is_present() {
            let kind = fe.kind(scope);
            if kind.is_subprogram() {
                return (scope, true);
            }
            if kind.is_record() {
                return (scope, false);
            }
            scope = fe.scope(scope);
        }
        (EntityId::EMPTY, false)
    }

    /// Function whose body encloses `decl`, if any.
    pub fn decl_function_context(&self, decl: DeclId) -> Option<DeclId> {
        let mut context = self.decl(decl).context;
        while let Some(ctx) = context {
            context = match ctx {
                Context::TranslationUnit => None,
                Context::Function(f) => return Some(f),
                Context::Type(ty) => self.ty(ty).context,
                Context::Decl(d) => self.decl(d).context,
            };
        }
        None
    }

    /// Set the context of `ty` and of its parallel types lacking one.
    pub fn gnat_set_type_context(&mut self, ty: TypeId, context: Context) {
        self.ty_mut(ty).context = Some(context);
        let mut parallel = self.ty(ty).parallel_type;
        while let Some(p) = parallel {
            if p == ty {
                break;
            }
            if self.ty(p).context.is_none() {
                self.ty_mut(p).context = Some(context);
                if let Some(stub) = self.ty(p).stub_decl {
                    self.decl_mut(stub).context = Some(context);
                }
            }
            parallel = self.ty(p).parallel_type;
        }
    }

    /// Chain `parallel` after the parallel types of `ty`.
    ///
    /// A parallel type without context inherits the one of `ty`, if set;
    /// otherwise it gets it when `ty` does.
    pub fn add_parallel_type(&mut self, ty: TypeId, parallel: TypeId) {
        let mut last = ty;
        while let Some(next) = self.ty(last).parallel_type {
            last = next;
        }
        self.ty_mut(last).parallel_type = Some(parallel);

        if self.ty(parallel).context.is_some() {
            return;
        }
        if let Some(context) = self.ty(ty).context {
            self.gnat_set_type_context(parallel, context);
        }
    }

    /// Whether `ty` has a parallel type.
    pub fn has_parallel_type(&self, ty: TypeId) -> bool {
        self.ty(ty).parallel_type.is_some()
    }

    fn defer_or_set_type_context(
        &mut self,
        ty: TypeId,
        context: Option<Context>,
        deferred: Option<DeferredToken>,
    ) {
        match deferred {
            Some(token) => self.add_deferred_type_context(token, ty),
            None => {
                let context = context.unwrap_or(Context::TranslationUnit);
                self.gnat_set_type_context(ty, context);
            }
        }
    }

    // ── Declaration placement ───────────────────────────────────

    /// Record `decl` in the current binding level and give it a context.
    ///
    /// `gnat_node` is the entity the declaration comes from, if any; it
    /// supplies the source location and the debug scope.
    pub fn gnat_pushdecl(&mut self, decl: DeclId, gnat_node: EntityId) {
        let mut context = None;
        let mut deferred = None;

        let d = self.decl(decl);
        let public_external = d.has(DeclFlags::PUBLIC) && d.has(DeclFlags::EXTERNAL);
        if !(public_external || self.levels.force_global == 1) {
            let (scope, is_subprogram) = self.get_debug_scope(gnat_node);
            let d = self.decl(decl);
            if scope.is_present() && !is_subprogram && !d.is_function() && !d.is_var() {
                deferred = Some(self.add_deferred_decl_context(decl, scope, self.levels.force_global));
            } else if let (Some(f), 0) = (self.levels.current_function, self.levels.force_global) {
                context = Some(Context::Function(f));
            }
        }

        if deferred.is_none() && context.is_none() {
            context = Some(self.get_global_context());
        }

        // Nested subprograms need a static chain and are never public.
        let d = self.decl(decl);
        if d.is_function() && !d.has(DeclFlags::EXTERNAL) {
            let nested = context.is_some_and(|ctx| self.context_in_function(ctx));
            if nested {
                let d = self.decl_mut(decl);
                d.flags |= DeclFlags::STATIC_CHAIN;
                d.flags.remove(DeclFlags::PUBLIC);
            }
        }

        if deferred.is_none() {
            self.decl_mut(decl).context = context;
        }

        let fe = self.frontend;
        if !gnat_node.is_present() || !fe.comes_from_source(gnat_node) || fe.warnings_off(gnat_node) {
            self.decl_mut(decl).flags |= DeclFlags::NO_WARNING;
        }
        if gnat_node.is_present() {
            self.decl_mut(decl).loc = Some(fe.sloc(gnat_node));
        }

        // Unconstrained array types are never declared: their fat pointer and
        // object record carry all the information.
        let d = self.decl(decl);
        let unc_array_type_decl = d.is_type_decl() && self.ty(d.ty).is_unconstrained_array();
        if !unc_array_type_decl {
            if d.has(DeclFlags::EXTERNAL) && d.is_function() && d.has(DeclFlags::BUILTIN) {
                self.levels.builtin_decls.push(decl);
            } else if self.global_bindings_p() {
                self.levels.global_decls.push(decl);
            } else if let Some(block) = self.levels.current() {
                self.arena.block_mut(block).vars.push(decl);
            } else {
                self.levels.global_decls.push(decl);
            }
        }

        if self.decl(decl).is_type_decl() && self.decl(decl).name.is_some() {
            self.name_type_from_decl(decl, context, deferred);
        }
    }

    /// Make `decl` the name of its type and the type's variants.
    fn name_type_from_decl(
        &mut self,
        decl: DeclId,
        context: Option<Context>,
        deferred: Option<DeferredToken>,
    ) {
        let t = self.decl(decl).ty;
        let node = self.ty(t);
        let is_pointer = node.is_pointer() || node.is_fat_pointer();
        let is_fat = node.is_fat_pointer();
        let named_by = node.name_decl;
        let artificial = self.decl(decl).has(DeclFlags::ARTIFICIAL);

        let propagate = if is_pointer && !artificial {
            // Pointer types are shared between designated types, so the
            // declaration names its own variant of the pointer.
            let tt = self.arena.build_variant(t);
            self.ty_mut(tt).name_decl = Some(decl);
            self.defer_or_set_type_context(tt, context, deferred);
            let original = named_by
                .and_then(|nd| match self.decl(nd).kind {
                    DeclKind::Type { original_type } => original_type,
                    _ => None,
                })
                .unwrap_or(t);
            let d = self.decl_mut(decl);
            d.ty = tt;
            d.kind = DeclKind::Type {
                original_type: Some(original),
            };
            if is_fat {
                self.ty_mut(t).flags |= TypeFlags::ARTIFICIAL;
            }
            false
        } else {
            match named_by {
                None => true,
                Some(nd) => self.decl(nd).has(DeclFlags::ARTIFICIAL) && !artificial,
            }
        };

        if !propagate {
            return;
        }
        for variant in self.arena.variants_of(t) {
            let v = self.ty(variant);
            if v.is_pointer() && v.name_decl.is_some() {
                continue;
            }
            self.ty_mut(variant).name_decl = Some(decl);
            self.defer_or_set_type_context(variant, context, deferred);
        }
    }

    /// Check the current function is the one `fndecl` is nested in, then
    /// open its body.
    pub(crate) fn enter_function(&mut self, fndecl: DeclId) -> Result<(), UtilsError> {
        if self.levels.current_function != self.decl_function_context(fndecl) {
            return Err(UtilsError::MisnestedSubprogram { decl: fndecl });
        }
        self.levels.current_function = Some(fndecl);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
